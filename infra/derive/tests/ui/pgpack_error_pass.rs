use pgpack_derive::pgpack_error;
use std::borrow::Cow;

#[pgpack_error]
pub enum ProbeError {
    #[error("I/O error{}: {source}", format_context(.context))]
    Io {
        #[source]
        source: std::io::Error,
        context: Option<Cow<'static, str>>,
    },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

fn read() -> Result<(), ProbeError> {
    std::fs::read_to_string("/definitely/not/here").map(|_| ()).context("reading probe")
}

fn main() {
    let err = read().unwrap_err();
    assert_eq!(err.context(), Some("reading probe"));
    let internal: ProbeError = "boom".into();
    assert!(internal.context().is_none());
}
