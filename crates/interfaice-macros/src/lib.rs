extern crate proc_macro;

mod attrs;
mod interface;
mod runtime_path;
mod transcode;

use proc_macro::TokenStream;
use syn::{DeriveInput, ItemTrait, parse_macro_input};

/// Derives `Describe`, `Encode` and `Transcode` for a struct with named
/// fields or an enum of unit variants.
///
/// Container attributes: `#[transcode(supertype = "path::Name")]`,
/// `#[transcode(constructor(a, b))]` and
/// `#[transcode(setter(name = "key", ty = "Type", with = "path::to::fn"))]`.
/// Field attributes: `rename = "key"`, `default`, `skip`. Variant attribute:
/// `rename = "NAME"`.
#[proc_macro_derive(Transcode, attributes(transcode))]
pub fn derive_transcode(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match transcode::expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Generates `<Trait>Proxy`, an implementation of the trait that answers
/// every method through a language model.
///
/// Supported method shapes:
///
/// - `fn m(&self, ..) -> Result<T, E>` blocks until the answer is decoded;
/// - `async fn m(&self, ..) -> Result<T, E>` suspends until it is decoded;
/// - `fn m(&self, ..) -> Deferred<T>` and `-> ResponseStream<T>`.
///
/// `E` must implement `From<InvokeError>`. Methods with a default body are
/// left to the trait. `#[ai_chat(model = "..", description = "..")]` sets
/// per-method request metadata.
#[proc_macro_attribute]
pub fn ai_interface(attr: TokenStream, item: TokenStream) -> TokenStream {
    if !attr.is_empty() {
        return syn::Error::new(
            proc_macro2::Span::call_site(),
            "#[ai_interface] takes no arguments",
        )
        .to_compile_error()
        .into();
    }
    let item = parse_macro_input!(item as ItemTrait);
    match interface::expand(item) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}
