use std::borrow::Cow;

/// A specialized [`ManifestError`] enum of this crate.
#[pgpack_derive::pgpack_error]
pub enum ManifestError {
    #[error("Manifest I/O error{}: {source}", format_context(.context))]
    Io { source: std::io::Error, context: Option<Cow<'static, str>> },

    #[error("Manifest JSON error{}: {source}", format_context(.context))]
    Json { source: serde_json::Error, context: Option<Cow<'static, str>> },

    /// Every validation problem found in one pass.
    #[error("Invalid manifest{}: {}", format_context(.context), .problems.join("; "))]
    Invalid { problems: Vec<String>, context: Option<Cow<'static, str>> },

    #[error("Extension '{entry}' depends on unknown entry '{dependency}'{}", format_context(.context))]
    UnknownDependency { entry: String, dependency: String, context: Option<Cow<'static, str>> },

    #[error(
        "Extension '{entry}' depends on disabled entry '{dependency}'{}",
        format_context(.context)
    )]
    DisabledDependency { entry: String, dependency: String, context: Option<Cow<'static, str>> },

    #[error("Extension '{name}' is declared more than once{}", format_context(.context))]
    Duplicate { name: String, context: Option<Cow<'static, str>> },

    #[error("Circular dependency between: {}{}", .entries.join(", "), format_context(.context))]
    Cycle { entries: Vec<String>, context: Option<Cow<'static, str>> },
}
