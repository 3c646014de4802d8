use proc_macro_crate::{FoundCrate, crate_name};
use proc_macro2::Span;

const RUNTIME_CRATE: &str = "interfaice";

/// Path the generated proxies and `Transcode` impls use to reach the runtime.
///
/// Inside the runtime package (its demos and tests) the lookup answers
/// `Itself`; those targets reach the library through the
/// `extern crate self as interfaice` alias. Renamed dependencies resolve to
/// their local name.
pub(crate) fn resolve_interfaice_path() -> syn::Result<syn::Path> {
    let local_name = match crate_name(RUNTIME_CRATE) {
        Ok(FoundCrate::Itself) => RUNTIME_CRATE.to_string(),
        Ok(FoundCrate::Name(name)) => name.replace('-', "_"),
        Err(err) => {
            return Err(syn::Error::new(
                Span::call_site(),
                format!(
                    "#[ai_interface] and #[derive(Transcode)] expand to calls into \
                     `{RUNTIME_CRATE}`, which is not a dependency of this crate ({err})"
                ),
            ));
        }
    };
    let ident = syn::Ident::new(&local_name, Span::call_site());
    Ok(syn::parse_quote!(::#ident))
}
