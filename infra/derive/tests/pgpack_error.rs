use pgpack_derive::pgpack_error;
use std::borrow::Cow;

#[pgpack_error]
pub enum SampleError {
    #[error("Parse error{}: {source}", format_context(.context))]
    Parse { source: std::num::ParseIntError, context: Option<Cow<'static, str>> },

    #[error("Limit exceeded{}: {message}", format_context(.context))]
    Limit { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn parse(raw: &str) -> Result<u32, SampleError> {
    Ok(raw.parse::<u32>()?)
}

fn parse_with_context(raw: &str) -> Result<u32, SampleError> {
    raw.parse::<u32>().context(format!("parsing '{raw}'"))
}

#[test]
fn pgpack_error_ui() {
    let t = trybuild::TestCases::new();
    t.pass("tests/ui/pgpack_error_pass.rs");
}

#[test]
fn question_mark_converts_source_errors() {
    let err = parse("x").unwrap_err();
    assert!(matches!(err, SampleError::Parse { context: None, .. }));
    assert!(err.to_string().starts_with("Parse error: "));
}

#[test]
fn context_is_rendered_in_display() {
    let err = parse_with_context("x").unwrap_err();
    assert_eq!(err.context(), Some("parsing 'x'"));
    assert!(err.to_string().starts_with("Parse error (parsing 'x'): "), "got: {err}");
}

#[test]
fn context_replaces_on_own_results() {
    let result: Result<(), SampleError> =
        Err(SampleError::Limit { message: "too many".into(), context: None });
    let err = result.context("first").context("second").unwrap_err();
    assert_eq!(err.to_string(), "Limit exceeded (second): too many");
}

#[test]
fn strings_convert_into_internal() {
    let err: SampleError = String::from("dynamic").into();
    assert!(matches!(err, SampleError::Internal { .. }));
    assert_eq!(err.to_string(), "Internal error: dynamic");
}
