//! `#[rpc]` and `#[action]` expansion.
//!
//! Both macros re-emit the annotated impl block (with consumed parameter
//! attributes stripped) and add a trait impl describing its callables.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{ImplItem, ItemImpl};

use crate::parse::{ActionMethod, MacroAttrs, ParamKind};

const ACTION_PREFIX: &str = "action_";

/// Expands `#[rpc]` into an `RpcMethods` implementation.
pub fn expand_rpc(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let attrs = MacroAttrs::parse(attr, false)?;
    let mut item_impl: ItemImpl = syn::parse2(item)?;
    if item_impl.trait_.is_some() {
        return Err(syn::Error::new_spanned(
            &item_impl.self_ty,
            "#[rpc] goes on an inherent impl block",
        ));
    }

    let mut methods = Vec::new();
    let mut constants = Vec::new();
    for impl_item in &mut item_impl.items {
        match impl_item {
            ImplItem::Fn(method) if method.sig.ident.to_string().starts_with(ACTION_PREFIX) => {
                methods.push(ActionMethod::parse(method)?);
            }
            ImplItem::Const(constant) => constants.push(constant.ident.clone()),
            _ => {}
        }
    }

    let krate = attrs.krate();
    let json = quote!(#krate::__private::serde_json);
    let source = quote!(#item_impl).to_string();

    let descriptors = methods.iter().map(|m| descriptor(&krate, &json, m));
    let arms = methods.iter().map(|m| {
        let name = m.ident.to_string();
        let call = invocation(&krate, &json, m);
        quote! { #name => { #call } }
    });
    let constant_values = constants.iter().map(|ident| {
        let name = ident.to_string();
        quote! {
            (#name, #json::to_value(Self::#ident).unwrap_or(#json::Value::Null))
        }
    });

    let self_ty = &item_impl.self_ty;
    let (impl_generics, _, where_clause) = item_impl.generics.split_for_impl();

    Ok(quote! {
        #item_impl

        impl #impl_generics #krate::service::RpcMethods for #self_ty #where_clause {
            fn methods(&self) -> ::std::vec::Vec<#krate::service::MethodDescriptor> {
                vec![#(#descriptors),*]
            }

            #[allow(unused_variables)]
            fn invoke(
                &self,
                method: &str,
                ctx: &mut #krate::CallContext,
                args: &mut #krate::service::Arguments,
            ) -> #krate::RpcResult<#json::Value> {
                match method {
                    #(#arms)*
                    _ => Err(#krate::RpcError::WrongActionType {
                        action: ctx.action().to_string(),
                    }),
                }
            }

            fn constants(&self) -> ::std::vec::Vec<(&'static str, #json::Value)> {
                vec![#(#constant_values),*]
            }

            fn source_text(&self) -> &'static str {
                #source
            }
        }
    })
}

/// Expands `#[action]` into an `ActionObject` implementation.
pub fn expand_action(attr: TokenStream, item: TokenStream) -> syn::Result<TokenStream> {
    let attrs = MacroAttrs::parse(attr, false)?;
    let mut item_impl: ItemImpl = syn::parse2(item)?;

    let mut entry = None;
    for impl_item in &mut item_impl.items {
        if let ImplItem::Fn(method) = impl_item {
            if method.sig.ident == "run" {
                entry = Some(ActionMethod::parse(method)?);
            }
        }
    }

    let krate = attrs.krate();
    let json = quote!(#krate::__private::serde_json);
    let (entry_fn, run_body) = match &entry {
        Some(method) => (
            {
                let descriptor = descriptor(&krate, &json, method);
                quote! { Some(#descriptor) }
            },
            invocation(&krate, &json, method),
        ),
        None => (
            quote! { None },
            quote! {
                Err(#krate::RpcError::NoRunMethod {
                    action: ctx.action().to_string(),
                })
            },
        ),
    };

    let self_ty = &item_impl.self_ty;
    let (impl_generics, _, where_clause) = item_impl.generics.split_for_impl();

    Ok(quote! {
        #item_impl

        impl #impl_generics #krate::service::ActionObject for #self_ty #where_clause {
            fn type_name(&self) -> &'static str {
                ::std::any::type_name::<Self>()
            }

            fn entry(&self) -> Option<#krate::service::MethodDescriptor> {
                #entry_fn
            }

            #[allow(unused_variables)]
            fn run(
                &self,
                ctx: &mut #krate::CallContext,
                args: &mut #krate::service::Arguments,
            ) -> #krate::RpcResult<#json::Value> {
                #run_body
            }
        }
    })
}

/// Builds the `MethodDescriptor` expression of a method.
fn descriptor(krate: &TokenStream, json: &TokenStream, method: &ActionMethod) -> TokenStream {
    let name = method.ident.to_string();
    let public = method.public;
    let doc = method
        .doc
        .as_ref()
        .map_or_else(|| quote!(None), |doc| quote!(Some(#doc)));

    let params = method.params.iter().filter_map(|param| match &param.kind {
        ParamKind::Context => None,
        ParamKind::Value {
            wire,
            default: Some(default),
            ..
        } => Some(quote! {
            #krate::service::ParamDescriptor::with_default(#wire, || {
                #json::to_value(#default).unwrap_or(#json::Value::Null)
            })
        }),
        ParamKind::Value {
            wire,
            optional: true,
            ..
        } => Some(quote! { #krate::service::ParamDescriptor::optional(#wire) }),
        ParamKind::Value { wire, .. } => {
            Some(quote! { #krate::service::ParamDescriptor::required(#wire) })
        }
    });

    quote! {
        #krate::service::MethodDescriptor::new(#name, #doc, vec![#(#params),*]).public(#public)
    }
}

/// Builds the argument bindings and the call of a method.
fn invocation(krate: &TokenStream, json: &TokenStream, method: &ActionMethod) -> TokenStream {
    let ident = &method.ident;
    let mut bindings = Vec::new();
    let mut call_args = Vec::new();

    for param in &method.params {
        let name = &param.ident;
        let ty = &param.ty;
        match &param.kind {
            ParamKind::Context => call_args.push(quote! { ctx }),
            ParamKind::Value { wire, default, .. } => {
                let default = default.as_ref().map_or_else(
                    || quote!(None),
                    |expr| quote!(Some(#json::to_value(#expr).unwrap_or(#json::Value::Null))),
                );
                bindings.push(quote! {
                    let #name: #ty = args.take(#wire, #default)?;
                });
                call_args.push(quote! { #name });
            }
        }
    }

    quote! {
        #(#bindings)*
        #krate::service::IntoRpcValue::into_rpc_value(self.#ident(#(#call_args),*))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_rpc_collects_actions_and_constants() {
        let item = quote! {
            impl Users {
                const LIMIT: u32 = 10;

                /// @api
                /// @param int userId User
                pub fn action_get_user(&self, user_id: i64) -> RpcResult<Value> {
                    Err(RpcError::custom("USER_NOT_FOUND", "missing"))
                }

                fn helper(&self) {}
            }
        };

        let expanded = expand_rpc(TokenStream::new(), item).unwrap().to_string();
        assert!(expanded.contains("RpcMethods for Users"));
        assert!(expanded.contains("\"action_get_user\""));
        assert!(expanded.contains("\"userId\""));
        assert!(expanded.contains("\"LIMIT\""));
        assert!(!expanded.contains("\"helper\""));
        assert!(expanded.contains("USER_NOT_FOUND"));
    }

    #[test]
    fn test_expand_rpc_rejects_trait_impl() {
        let item = quote! {
            impl Default for Users {
                fn default() -> Self { Users }
            }
        };
        assert!(expand_rpc(TokenStream::new(), item).is_err());
    }

    #[test]
    fn test_expand_rpc_rejects_missing_return() {
        let item = quote! {
            impl Users {
                fn action_x(&self) {}
            }
        };
        assert!(expand_rpc(TokenStream::new(), item).is_err());
    }

    #[test]
    fn test_expand_action_without_run() {
        let item = quote! {
            impl Export {
                pub fn execute(&self) -> RpcResult<bool> { Ok(true) }
            }
        };
        let expanded = expand_action(TokenStream::new(), item).unwrap().to_string();
        assert!(expanded.contains("NoRunMethod"));
    }

    #[test]
    fn test_expand_action_with_custom_crate() {
        let item = quote! {
            impl Export {
                /// @api
                pub fn run(&self) -> RpcResult<bool> { Ok(true) }
            }
        };
        let expanded = expand_action(quote!(crate = "daedalus::core"), item)
            .unwrap()
            .to_string();
        assert!(expanded.contains("daedalus :: core :: service :: ActionObject"));
        assert!(!expanded.contains("NoRunMethod"));
    }
}
