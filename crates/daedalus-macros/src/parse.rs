//! Parsing utilities for the service macros.
//!
//! This module provides parsing for macro attributes, doc comments and
//! action method signatures.

use daedalus_core::naming::snake_to_camel;
use proc_macro2::TokenStream;
use syn::{
    parse::Parser, spanned::Spanned, Attribute, Expr, ExprLit, FnArg, GenericArgument, Ident,
    ImplItemFn, Lit, LitStr, Meta, Pat, PatIdent, PatType, Path, PathArguments, Type, Visibility,
};

/// Parsed `#[service(...)]` / `#[rpc(...)]` / `#[action(...)]` attributes.
#[derive(Debug, Default)]
pub struct MacroAttrs {
    /// Route prefix override.
    pub route: Option<String>,
    /// Path of the core crate in generated code.
    pub krate: Option<Path>,
}

impl MacroAttrs {
    /// Parses the attribute arguments.
    ///
    /// `route` is only meaningful for `#[service]`; other macros reject it.
    pub fn parse(attr: TokenStream, allow_route: bool) -> syn::Result<Self> {
        let mut attrs = Self::default();
        let parser = syn::meta::parser(|meta| {
            if meta.path.is_ident("crate") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.krate = Some(value.parse()?);
                Ok(())
            } else if allow_route && meta.path.is_ident("route") {
                let value: LitStr = meta.value()?.parse()?;
                attrs.route = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported attribute"))
            }
        });
        parser.parse2(attr)?;
        Ok(attrs)
    }

    /// Returns the core crate path, `::daedalus_core` by default.
    pub fn krate(&self) -> TokenStream {
        self.krate
            .as_ref()
            .map_or_else(|| quote::quote!(::daedalus_core), |path| quote::quote!(#path))
    }
}

/// Collects `///` doc lines into one text block, `None` without any.
pub fn doc_text(attrs: &[Attribute]) -> Option<String> {
    let lines: Vec<String> = attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            Meta::NameValue(nv) => match &nv.value {
                Expr::Lit(ExprLit {
                    lit: Lit::Str(s), ..
                }) => Some(s.value()),
                _ => None,
            },
            _ => None,
        })
        .map(|line| line.strip_prefix(' ').map(str::to_string).unwrap_or(line))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// How a parameter is bound when the method is invoked.
#[derive(Debug)]
pub enum ParamKind {
    /// `&CallContext` / `&mut CallContext`, passed through.
    Context,
    /// A value bound from the request.
    Value {
        /// Wire name.
        wire: String,
        /// `Option<T>` parameter.
        optional: bool,
        /// `#[default(expr)]` value.
        default: Option<Expr>,
    },
}

/// A parsed action method parameter.
#[derive(Debug)]
pub struct ActionParam {
    /// Binding identifier.
    pub ident: Ident,
    /// Declared type.
    pub ty: Type,
    /// Binding kind.
    pub kind: ParamKind,
}

impl ActionParam {
    /// Parses a typed function argument, stripping `#[default]` from it.
    pub fn from_pat_type(pat_type: &mut PatType) -> syn::Result<Self> {
        let ident = match &*pat_type.pat {
            Pat::Ident(PatIdent { ident, .. }) => ident.clone(),
            other => {
                return Err(syn::Error::new(
                    other.span(),
                    "action parameters must be plain identifiers",
                ))
            }
        };

        let mut default = None;
        let mut kept = Vec::with_capacity(pat_type.attrs.len());
        for attr in pat_type.attrs.drain(..) {
            if attr.path().is_ident("default") {
                default = Some(attr.parse_args::<Expr>()?);
            } else {
                kept.push(attr);
            }
        }
        pat_type.attrs = kept;

        let ty = (*pat_type.ty).clone();
        let kind = if is_context_type(&ty) {
            if default.is_some() {
                return Err(syn::Error::new(
                    ident.span(),
                    "the call context cannot have a default",
                ));
            }
            ParamKind::Context
        } else {
            ParamKind::Value {
                wire: snake_to_camel(&ident.to_string()),
                optional: is_option_type(&ty),
                default,
            }
        };

        Ok(Self { ident, ty, kind })
    }
}

/// A parsed action method (`action_*` or `run`).
#[derive(Debug)]
pub struct ActionMethod {
    /// Method identifier.
    pub ident: Ident,
    /// Doc comment text.
    pub doc: Option<String>,
    /// Declared `pub`.
    pub public: bool,
    /// Parameters after `&self`.
    pub params: Vec<ActionParam>,
}

impl ActionMethod {
    /// Parses an impl method, stripping parameter attributes it consumes.
    pub fn parse(method: &mut ImplItemFn) -> syn::Result<Self> {
        let sig = &mut method.sig;
        if sig.asyncness.is_some() {
            return Err(syn::Error::new(
                sig.asyncness.span(),
                "action methods are synchronous",
            ));
        }

        let mut inputs = sig.inputs.iter_mut();
        match inputs.next() {
            Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() && receiver.mutability.is_none() => {}
            _ => {
                return Err(syn::Error::new(
                    sig.ident.span(),
                    "action methods must take `&self`",
                ))
            }
        }

        let params = inputs
            .map(|arg| match arg {
                FnArg::Typed(pat_type) => ActionParam::from_pat_type(pat_type),
                FnArg::Receiver(receiver) => {
                    Err(syn::Error::new(receiver.span(), "unexpected receiver"))
                }
            })
            .collect::<syn::Result<Vec<_>>>()?;

        if matches!(sig.output, syn::ReturnType::Default) {
            return Err(syn::Error::new(
                sig.ident.span(),
                "action methods must return a `Result`",
            ));
        }

        Ok(Self {
            ident: sig.ident.clone(),
            doc: doc_text(&method.attrs),
            public: matches!(method.vis, Visibility::Public(_)),
            params,
        })
    }
}

fn last_segment_ident(ty: &Type) -> Option<&Ident> {
    match ty {
        Type::Path(type_path) => type_path.path.segments.last().map(|s| &s.ident),
        _ => None,
    }
}

/// Checks if a type is `&CallContext` or `&mut CallContext`.
fn is_context_type(ty: &Type) -> bool {
    match ty {
        Type::Reference(reference) => {
            last_segment_ident(&reference.elem).is_some_and(|ident| ident == "CallContext")
        }
        _ => false,
    }
}

/// Checks if a type is an `Option<T>`.
fn is_option_type(ty: &Type) -> bool {
    if let Type::Path(type_path) = ty {
        if let Some(segment) = type_path.path.segments.last() {
            if segment.ident == "Option" {
                if let PathArguments::AngleBracketed(args) = &segment.arguments {
                    return matches!(args.args.first(), Some(GenericArgument::Type(_)));
                }
            }
        }
    }
    false
}
