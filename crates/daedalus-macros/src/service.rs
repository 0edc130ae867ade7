//! `#[service]` expansion.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Fields, ItemStruct, Visibility};

use daedalus_core::naming::camel_to_dash;

use crate::parse::{doc_text, MacroAttrs};

/// Suffixes dropped from the type name when deriving the default route.
const ROUTE_SUFFIXES: [&str; 3] = ["Service", "Controller", "Api"];

/// Expands `#[service]` into a `ServiceMeta` implementation.
///
/// Public named fields become properties; a field attribute
/// `#[property(skip)]` excludes one (and is stripped).
pub fn expand_service(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let attrs = MacroAttrs::parse(attr, true)?;
    let mut item_struct: ItemStruct = syn::parse2(item)?;

    let ident = &item_struct.ident;
    let short_name = ident.to_string();
    let route = attrs
        .route
        .clone()
        .unwrap_or_else(|| format!("/{}", camel_to_dash(default_route_stem(&short_name))));
    let description = doc_text(&item_struct.attrs)
        .map_or_else(|| quote!(None), |doc| quote!(Some(#doc)));

    let krate = attrs.krate();
    let json = quote!(#krate::__private::serde_json);

    let mut properties = Vec::new();
    if let Fields::Named(fields) = &mut item_struct.fields {
        for field in &mut fields.named {
            let skip = take_skip_attr(&mut field.attrs)?;
            if skip || !matches!(field.vis, Visibility::Public(_)) {
                continue;
            }
            let Some(field_ident) = field.ident.as_ref() else {
                continue;
            };
            let name = field_ident.to_string();
            let ty = &field.ty;
            let rust_type = quote!(#ty).to_string().replace(' ', "");
            let doc = doc_text(&field.attrs).map_or_else(|| quote!(None), |doc| quote!(Some(#doc)));
            properties.push(quote! {
                #krate::service::PropertyDescriptor {
                    name: #name,
                    rust_type: #rust_type,
                    doc: #doc,
                    value: #json::to_value(&self.#field_ident).ok(),
                }
            });
        }
    }

    let (impl_generics, ty_generics, where_clause) = item_struct.generics.split_for_impl();

    Ok(quote! {
        #item_struct

        impl #impl_generics #krate::service::ServiceMeta for #ident #ty_generics #where_clause {
            fn service_info(&self) -> #krate::service::ServiceInfo {
                #krate::service::ServiceInfo::new(
                    #short_name,
                    ::std::module_path!(),
                    ::std::file!(),
                    #route,
                    #description,
                )
            }

            fn properties(&self) -> ::std::vec::Vec<#krate::service::PropertyDescriptor> {
                vec![#(#properties),*]
            }
        }
    })
}

fn default_route_stem(name: &str) -> &str {
    ROUTE_SUFFIXES
        .iter()
        .find_map(|suffix| name.strip_suffix(suffix).filter(|stem| !stem.is_empty()))
        .unwrap_or(name)
}

/// Removes `#[property(skip)]` from a field, returning whether it was there.
fn take_skip_attr(attrs: &mut Vec<syn::Attribute>) -> syn::Result<bool> {
    let mut skip = false;
    let mut error = None;
    attrs.retain(|attr| {
        if !attr.path().is_ident("property") {
            return true;
        }
        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skip = true;
                Ok(())
            } else {
                Err(meta.error("expected `skip`"))
            }
        });
        if let Err(e) = parsed {
            error = Some(e);
        }
        false
    });
    error.map_or(Ok(skip), Err)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_route_strips_suffix() {
        assert_eq!(default_route_stem("UserService"), "User");
        assert_eq!(default_route_stem("Service"), "Service");
        assert_eq!(default_route_stem("Orders"), "Orders");
    }

    #[test]
    fn test_expand_service_properties() {
        let item = quote! {
            /// Manages orders.
            pub struct OrderService {
                /// @var bool Whether sessions are used
                pub stateless: bool,
                #[property(skip)]
                pub pool: Pool,
                secret: String,
            }
        };

        let expanded = expand_service(TokenStream::new(), item).unwrap().to_string();
        assert!(expanded.contains("\"/order\""));
        assert!(expanded.contains("\"stateless\""));
        assert!(!expanded.contains("\"pool\""));
        assert!(!expanded.contains("\"secret\""));
        assert!(!expanded.contains("property"));
        assert!(expanded.contains("Manages orders."));
    }

    #[test]
    fn test_expand_service_route_override() {
        let item = quote! { pub struct Users; };
        let expanded = expand_service(quote!(route = "/api/v1/users"), item)
            .unwrap()
            .to_string();
        assert!(expanded.contains("\"/api/v1/users\""));
    }

    #[test]
    fn test_unknown_property_option() {
        let item = quote! {
            pub struct Users {
                #[property(hide)]
                pub a: u8,
            }
        };
        assert!(expand_service(TokenStream::new(), item).is_err());
    }
}
