use proc_macro2::TokenStream;
use quote::{format_ident, quote};
use syn::{
    FnArg, GenericArgument, Ident, ItemTrait, Pat, PathArguments, ReturnType, Signature, TraitItem,
    TraitItemFn, Type,
};

use crate::attrs::{ChatAttrs, take_chat_attrs};
use crate::runtime_path::resolve_interfaice_path;

/// How a method hands its result back to the caller.
enum Convention {
    Blocking,
    Suspending,
    Deferred,
    Stream,
}

struct MethodPlan {
    signature: Signature,
    chat: ChatAttrs,
    parameters: Vec<(Ident, Type)>,
    convention: Convention,
    /// Declared return type, e.g. `Deferred<City>`.
    returns: Type,
    /// Type the model's answer decodes into.
    output: Type,
}

pub(crate) fn expand(mut item: ItemTrait) -> syn::Result<TokenStream> {
    let rt = resolve_interfaice_path()?;
    if !item.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &item.generics,
            "#[ai_interface] traits cannot be generic",
        ));
    }

    let mut plans = Vec::new();
    for trait_item in &mut item.items {
        match trait_item {
            TraitItem::Fn(method) => {
                let chat = take_chat_attrs(&mut method.attrs)?;
                if method.default.is_none() {
                    plans.push(plan_method(method, chat)?);
                }
            }
            TraitItem::Const(constant) if constant.default.is_some() => {}
            TraitItem::Type(ty) if ty.default.is_some() => {}
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "#[ai_interface] traits may only declare methods (and items with defaults)",
                ));
            }
        }
    }

    let trait_ident = &item.ident;
    let interface_name = trait_ident.to_string();
    let proxy = format_ident!("{}Proxy", trait_ident);
    let vis = &item.vis;
    let proxy_doc = format!("Model-backed implementation of [`{interface_name}`].");
    let methods = plans.iter().map(|plan| expand_method(&rt, plan));

    Ok(quote! {
        #[allow(async_fn_in_trait)]
        #item

        #[doc = #proxy_doc]
        #[derive(Clone)]
        #vis struct #proxy {
            dispatcher: #rt::Dispatcher,
        }

        impl #proxy {
            pub fn dispatcher(&self) -> &#rt::Dispatcher {
                &self.dispatcher
            }
        }

        impl ::std::fmt::Debug for #proxy {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.debug_struct(stringify!(#proxy))
                    .field("interface", &#interface_name)
                    .field("model", &self.dispatcher.default_model())
                    .finish_non_exhaustive()
            }
        }

        impl #rt::AiInterface for #proxy {
            const NAME: &'static str = #interface_name;

            fn from_dispatcher(dispatcher: #rt::Dispatcher) -> Self {
                Self { dispatcher }
            }
        }

        impl #trait_ident for #proxy {
            #(#methods)*
        }
    })
}

fn plan_method(method: &TraitItemFn, chat: ChatAttrs) -> syn::Result<MethodPlan> {
    let signature = &method.sig;
    if !signature.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &signature.generics,
            "#[ai_interface] methods cannot declare generics or lifetimes",
        ));
    }

    let mut inputs = signature.inputs.iter();
    match inputs.next() {
        Some(FnArg::Receiver(receiver)) if receiver.reference.is_some() => {}
        _ => {
            return Err(syn::Error::new_spanned(
                signature,
                "#[ai_interface] methods must take `&self`",
            ));
        }
    }

    let mut parameters = Vec::new();
    for input in inputs {
        let FnArg::Typed(typed) = input else {
            continue;
        };
        let Pat::Ident(pat) = typed.pat.as_ref() else {
            return Err(syn::Error::new_spanned(
                &typed.pat,
                "#[ai_interface] parameters must be plain identifiers",
            ));
        };
        parameters.push((pat.ident.clone(), (*typed.ty).clone()));
    }

    let ReturnType::Type(_, returns) = &signature.output else {
        return Err(syn::Error::new_spanned(
            signature,
            "#[ai_interface] methods must return `Result<T, E>`, `Deferred<T>` or `ResponseStream<T>`",
        ));
    };
    let (wrapper, output) = split_return_type(returns)?;
    let convention = match (wrapper.as_str(), signature.asyncness.is_some()) {
        ("Result", false) => Convention::Blocking,
        ("Result", true) => Convention::Suspending,
        ("Deferred", false) => Convention::Deferred,
        ("ResponseStream", false) => Convention::Stream,
        (_, true) => {
            return Err(syn::Error::new_spanned(
                returns,
                "async #[ai_interface] methods must return `Result<T, E>`",
            ));
        }
        _ => {
            return Err(syn::Error::new_spanned(
                returns,
                "#[ai_interface] methods must return `Result<T, E>`, `Deferred<T>` or `ResponseStream<T>`",
            ));
        }
    };

    Ok(MethodPlan {
        signature: signature.clone(),
        chat,
        parameters,
        convention,
        returns: (**returns).clone(),
        output,
    })
}

/// Splits `Wrapper<T, ..>` into the wrapper's name and `T`.
fn split_return_type(ty: &Type) -> syn::Result<(String, Type)> {
    let unsupported = || {
        syn::Error::new_spanned(
            ty,
            "expected `Result<T, E>`, `Deferred<T>` or `ResponseStream<T>`",
        )
    };
    let Type::Path(path) = ty else {
        return Err(unsupported());
    };
    let segment = path.path.segments.last().ok_or_else(unsupported)?;
    let PathArguments::AngleBracketed(arguments) = &segment.arguments else {
        return Err(unsupported());
    };
    let output = arguments
        .args
        .iter()
        .find_map(|argument| match argument {
            GenericArgument::Type(ty) => Some(ty.clone()),
            _ => None,
        })
        .ok_or_else(unsupported)?;
    Ok((segment.ident.to_string(), output))
}

fn expand_method(rt: &syn::Path, plan: &MethodPlan) -> TokenStream {
    let signature = &plan.signature;
    let name = signature.ident.to_string();
    let output = &plan.output;
    let returns = &plan.returns;

    let parameter_names = plan.parameters.iter().map(|(ident, _)| ident.to_string());
    let parameter_types = plan.parameters.iter().map(|(_, ty)| ty);
    let arguments = plan.parameters.iter().map(|(ident, _)| ident);

    let declared_return = match plan.convention {
        Convention::Blocking => quote! { .returns(<#output as #rt::Describe>::descriptor()) },
        Convention::Suspending => quote! {
            .parameter("continuation", <#rt::Continuation<#output> as #rt::Describe>::descriptor())
        },
        Convention::Deferred | Convention::Stream => {
            quote! { .returns(<#returns as #rt::Describe>::descriptor()) }
        }
    };
    let model = plan.chat.model.as_ref().map(|model| quote! { .model(#model) });
    let description = plan
        .chat
        .description
        .as_ref()
        .map(|description| quote! { .description(#description) });

    let dispatch = match plan.convention {
        Convention::Blocking => quote! {
            self.dispatcher
                .invoke_blocking::<#output>(__interfaice_call)
                .map_err(::std::convert::Into::into)
        },
        Convention::Suspending => quote! {
            let (__interfaice_continuation, __interfaice_completion) =
                #rt::Continuation::<#output>::channel(#name);
            self.dispatcher.suspend(__interfaice_call, __interfaice_continuation);
            __interfaice_completion.await.map_err(::std::convert::Into::into)
        },
        Convention::Deferred => quote! {
            self.dispatcher.invoke_single::<#output>(__interfaice_call)
        },
        Convention::Stream => quote! {
            self.dispatcher.invoke_stream::<#output>(__interfaice_call)
        },
    };

    quote! {
        #signature {
            static __INTERFAICE_SIGNATURE: ::std::sync::LazyLock<#rt::MethodSignature> =
                ::std::sync::LazyLock::new(|| {
                    #rt::MethodSignature::new(#name)
                        #(.parameter(#parameter_names, <#parameter_types as #rt::Describe>::descriptor()))*
                        #declared_return
                        #model
                        #description
                });
            let __interfaice_call = #rt::Call::new(::std::clone::Clone::clone(&*__INTERFAICE_SIGNATURE))
                #(.argument(&#arguments))*;
            #dispatch
        }
    }
}
