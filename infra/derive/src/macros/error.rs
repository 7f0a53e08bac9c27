use fxhash::FxHashSet;
use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Field, Fields, FieldsNamed, Ident, Type, Variant};

/// Parsed view of one enum variant.
struct ErrorVariant<'a> {
    ident: &'a Ident,
    source: Option<(&'a Ident, &'a Type)>,
    has_context: bool,
    has_message: bool,
    cfg: Vec<&'a Attribute>,
}

impl ErrorVariant<'_> {
    fn is_internal(&self) -> bool {
        self.ident == "Internal"
    }
}

/// Parsed view of the whole enum.
struct ErrorModel<'a> {
    input: &'a DeriveInput,
    variants: Vec<ErrorVariant<'a>>,
}

pub fn expand(input: DeriveInput) -> TokenStream {
    match ErrorModel::parse(&input) {
        Ok(model) => model.expand(),
        Err(err) => err.to_compile_error(),
    }
}

impl<'a> ErrorModel<'a> {
    fn parse(input: &'a DeriveInput) -> syn::Result<Self> {
        let Data::Enum(data) = &input.data else {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "pgpack_error can only be applied to enums",
            ));
        };

        let variants = data.variants.iter().map(parse_variant).collect::<syn::Result<Vec<_>>>()?;

        if let Some(v) = variants.iter().find(|v| v.source.is_some() && !v.has_context) {
            return Err(syn::Error::new_spanned(
                v.ident,
                "variants with a source need `context: Option<Cow<'static, str>>`",
            ));
        }

        Ok(Self { input, variants })
    }

    fn expand(&self) -> TokenStream {
        let input = self.input;
        let derives = self.missing_derives();
        let ext = self.ext_trait();
        let conversions = self.variants.iter().filter_map(|v| self.source_conversion(v));
        let internal = self.internal_conversions();
        let accessor = self.context_accessor();

        quote! {
            #[allow(non_shorthand_field_patterns)]
            #derives
            #input

            #ext
            #(#conversions)*
            #internal
            #accessor

            #[allow(dead_code)]
            fn format_context(context: &Option<std::borrow::Cow<'static, str>>) -> std::borrow::Cow<'static, str> {
                match context {
                    Some(c) => std::borrow::Cow::Owned(format!(" ({c})")),
                    None => std::borrow::Cow::Borrowed(""),
                }
            }
        }
    }

    fn missing_derives(&self) -> TokenStream {
        let present = derived_traits(&self.input.attrs);
        let mut derives = Vec::new();
        if !present.contains("Debug") {
            derives.push(quote! { Debug });
        }
        if !present.contains("Error") {
            derives.push(quote! { ::thiserror::Error });
        }
        if derives.is_empty() { quote! {} } else { quote! { #[derive(#(#derives),*)] } }
    }

    fn ext_trait(&self) -> TokenStream {
        let name = &self.input.ident;
        let ext = format_ident!("{name}Ext");
        let arms = self.variants.iter().filter(|v| v.has_context).map(|v| {
            let ident = v.ident;
            let cfg = &v.cfg;
            quote! { #(#cfg)* #name::#ident { context: slot, .. } => *slot = Some(context.into()), }
        });

        quote! {
            pub trait #ext<T> {
                /// Attaches a human readable context to the error, replacing any previous one.
                fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Result<T, #name>;
            }

            #[automatically_derived]
            impl<T> #ext<T> for Result<T, #name> {
                #[inline]
                fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> Self {
                    self.map_err(|mut err| {
                        #[allow(unreachable_patterns)]
                        match &mut err {
                            #(#arms)*
                            _ => {}
                        }
                        err
                    })
                }
            }
        }
    }

    fn source_conversion(&self, v: &ErrorVariant<'_>) -> Option<TokenStream> {
        if v.is_internal() {
            return None;
        }
        let (field, ty) = v.source?;
        let name = &self.input.ident;
        let ext = format_ident!("{name}Ext");
        let ident = v.ident;
        let cfg = &v.cfg;

        Some(quote! {
            #(#cfg)*
            #[automatically_derived]
            impl From<#ty> for #name {
                #[inline]
                fn from(#field: #ty) -> Self { Self::#ident { #field, context: None } }
            }

            #(#cfg)*
            #[automatically_derived]
            impl<T> #ext<T> for std::result::Result<T, #ty> {
                #[inline]
                fn context(self, context: impl Into<std::borrow::Cow<'static, str>>) -> std::result::Result<T, #name> {
                    self.map_err(|#field| #name::#ident { #field, context: Some(context.into()) })
                }
            }
        })
    }

    fn internal_conversions(&self) -> TokenStream {
        let Some(internal) = self.variants.iter().find(|v| v.is_internal() && v.has_message) else {
            return quote! {};
        };
        let name = &self.input.ident;
        let cfg = &internal.cfg;
        let context = if internal.has_context { quote! { context: None } } else { quote! {} };

        quote! {
            #(#cfg)*
            impl From<&'static str> for #name {
                #[inline]
                fn from(s: &'static str) -> Self {
                    Self::Internal { message: std::borrow::Cow::Borrowed(s), #context }
                }
            }

            #(#cfg)*
            impl From<String> for #name {
                #[inline]
                fn from(s: String) -> Self {
                    Self::Internal { message: std::borrow::Cow::Owned(s), #context }
                }
            }
        }
    }

    fn context_accessor(&self) -> TokenStream {
        let name = &self.input.ident;
        let arms = self.variants.iter().filter(|v| v.has_context).map(|v| {
            let ident = v.ident;
            let cfg = &v.cfg;
            quote! { #(#cfg)* Self::#ident { context, .. } => context.as_deref(), }
        });

        quote! {
            impl #name {
                /// Returns the context attached through `.context(...)`, if any.
                #[must_use]
                #[allow(dead_code)]
                pub fn context(&self) -> Option<&str> {
                    #[allow(unreachable_patterns)]
                    match self {
                        #(#arms)*
                        _ => None,
                    }
                }
            }
        }
    }
}

fn parse_variant(v: &Variant) -> syn::Result<ErrorVariant<'_>> {
    let Fields::Named(fields) = &v.fields else {
        return Err(syn::Error::new_spanned(
            v,
            "pgpack_error variants must use named fields (`Variant { .. }`)",
        ));
    };

    let has_context = context_field(fields)?.is_some();
    let source = fields
        .named
        .iter()
        .find(|f| is_named(f, "source") || has_attr(f, "source") || has_attr(f, "from"))
        .and_then(|f| f.ident.as_ref().map(|ident| (ident, &f.ty)));
    let has_message = fields.named.iter().any(|f| is_named(f, "message"));
    let cfg = v.attrs.iter().filter(|a| a.path().is_ident("cfg")).collect();

    Ok(ErrorVariant { ident: &v.ident, source, has_context, has_message, cfg })
}

fn context_field(fields: &FieldsNamed) -> syn::Result<Option<&Field>> {
    let Some(field) = fields.named.iter().find(|f| is_named(f, "context")) else {
        return Ok(None);
    };
    if is_cow_static_str_option(&field.ty) {
        Ok(Some(field))
    } else {
        Err(syn::Error::new_spanned(&field.ty, "context field must be Option<Cow<'static, str>>"))
    }
}

fn is_named(field: &Field, name: &str) -> bool {
    field.ident.as_ref().is_some_and(|ident| ident == name)
}

fn has_attr(field: &Field, name: &str) -> bool {
    field.attrs.iter().any(|attr| attr.path().is_ident(name))
}

fn derived_traits(attrs: &[Attribute]) -> FxHashSet<String> {
    let mut traits = FxHashSet::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("derive")) {
        let _ = attr.parse_nested_meta(|meta| {
            if let Some(seg) = meta.path.segments.last() {
                traits.insert(seg.ident.to_string());
            }
            Ok(())
        });
    }
    traits
}

/// Matches `Option<Cow<'static, str>>` with any path prefix on `Option`/`Cow`.
fn is_cow_static_str_option(ty: &Type) -> bool {
    let Some(inner) = single_generic(ty, "Option") else {
        return false;
    };
    let Type::Path(path) = inner else {
        return false;
    };
    let Some(seg) = path.path.segments.last().filter(|s| s.ident == "Cow") else {
        return false;
    };
    let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
        return false;
    };
    let mut args = args.args.iter();
    let lifetime_ok = matches!(args.next(), Some(syn::GenericArgument::Lifetime(lt)) if lt.ident == "static");
    let str_ok = matches!(
        args.next(),
        Some(syn::GenericArgument::Type(Type::Path(p))) if p.path.is_ident("str")
    );
    lifetime_ok && str_ok
}

fn single_generic<'t>(ty: &'t Type, wrapper: &str) -> Option<&'t Type> {
    let Type::Path(path) = ty else {
        return None;
    };
    let seg = path.path.segments.last().filter(|s| s.ident == wrapper)?;
    let syn::PathArguments::AngleBracketed(args) = &seg.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}
