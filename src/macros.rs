//! Test declaration macros.

/// Declare a golden test.
///
/// With a list of glob patterns, the body runs once per matching golden
/// file with `$golden` bound to that file's [`GoldenFixture`](crate::GoldenFixture).
/// Patterns are relative to the directory of the declaring source file.
/// All cases run even if some fail; the test fails with a report listing
/// every failed case.
///
/// Without patterns, `$golden` is a [`GoldenFactory`](crate::GoldenFactory)
/// that opens golden files on demand.
///
/// Bodies may use `?` on any error type.
///
/// # Example
///
/// ```ignore
/// use golden_fixtures::golden_test;
///
/// golden_test! {
///     ["find_words/*.yml"]
///     fn test_find_words(golden) {
///         let input: String = golden.input("input")?;
///         assert!(golden.output("output")? == find_words(&input));
///     }
/// }
///
/// golden_test! {
///     fn test_two_files(goldens) {
///         let a = goldens.open("pair/a.yml")?;
///         let b = goldens.open("pair/b.yml")?;
///         assert!(b.output("output")? == a.input::<String>("input")?);
///     }
/// }
/// ```
#[macro_export]
macro_rules! golden_test {
    (
        [$($pattern:expr),+ $(,)?]
        $(#[$meta:meta])*
        fn $name:ident($golden:ident) $body:block
    ) => {
        $(#[$meta])*
        #[test]
        #[allow(unreachable_code)]
        fn $name() {
            let site = $crate::test_site!($name);
            $crate::harness::run_cases(
                &site,
                &[$($pattern),+],
                |$golden: &$crate::GoldenFixture| -> ::std::result::Result<(), $crate::BoxError> {
                    $body
                    Ok(())
                },
            );
        }
    };

    (
        $(#[$meta:meta])*
        fn $name:ident($factory:ident) $body:block
    ) => {
        $(#[$meta])*
        #[test]
        #[allow(unreachable_code)]
        fn $name() {
            let site = $crate::test_site!($name);
            $crate::harness::run_with_factory(
                &site,
                |$factory: &$crate::GoldenFactory| -> ::std::result::Result<(), $crate::BoxError> {
                    $body
                    Ok(())
                },
            );
        }
    };
}

/// [`TestSite`](crate::harness::TestSite) of the calling test function.
#[doc(hidden)]
#[macro_export]
macro_rules! test_site {
    ($name:ident) => {
        $crate::harness::TestSite {
            name: stringify!($name),
            manifest_dir: env!("CARGO_MANIFEST_DIR"),
            file: file!(),
        }
    };
}
