use syn::punctuated::Punctuated;
use syn::spanned::Spanned;
use syn::{Attribute, Expr, ExprLit, Ident, Lit, Meta, MetaList, Path, Token, Type};

#[derive(Default)]
pub(crate) struct ContainerAttrs {
    pub supertypes: Vec<String>,
    pub constructors: Vec<Vec<Ident>>,
    pub setters: Vec<SetterAttr>,
}

pub(crate) struct SetterAttr {
    pub name: String,
    pub ty: Type,
    pub with: Path,
}

#[derive(Default)]
pub(crate) struct FieldAttrs {
    pub rename: Option<String>,
    pub default: bool,
    pub skip: bool,
}

#[derive(Default)]
pub(crate) struct VariantAttrs {
    pub rename: Option<String>,
}

#[derive(Default)]
pub(crate) struct ChatAttrs {
    pub model: Option<String>,
    pub description: Option<String>,
}

pub(crate) fn parse_container_attrs(attrs: &[Attribute]) -> syn::Result<ContainerAttrs> {
    let mut out = ContainerAttrs::default();
    for meta in transcode_metas(attrs)? {
        match meta {
            Meta::NameValue(meta) if meta.path.is_ident("supertype") => {
                out.supertypes.push(parse_string_expr(&meta.value)?);
            }
            Meta::List(meta) if meta.path.is_ident("constructor") => {
                let parameters = meta
                    .parse_args_with(Punctuated::<Ident, Token![,]>::parse_terminated)?
                    .into_iter()
                    .collect();
                out.constructors.push(parameters);
            }
            Meta::List(meta) if meta.path.is_ident("setter") => {
                out.setters.push(parse_setter(&meta)?);
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "unsupported #[transcode(...)] attribute; expected `supertype`, `constructor(..)` or `setter(..)`",
                ));
            }
        }
    }
    Ok(out)
}

pub(crate) fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut out = FieldAttrs::default();
    for meta in transcode_metas(attrs)? {
        match meta {
            Meta::NameValue(meta) if meta.path.is_ident("rename") => {
                out.rename = Some(parse_string_expr(&meta.value)?);
            }
            Meta::Path(path) if path.is_ident("default") => out.default = true,
            Meta::Path(path) if path.is_ident("skip") => out.skip = true,
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "unsupported #[transcode(...)] field attribute; expected `rename`, `default` or `skip`",
                ));
            }
        }
    }
    Ok(out)
}

pub(crate) fn parse_variant_attrs(attrs: &[Attribute]) -> syn::Result<VariantAttrs> {
    let mut out = VariantAttrs::default();
    for meta in transcode_metas(attrs)? {
        match meta {
            Meta::NameValue(meta) if meta.path.is_ident("rename") => {
                out.rename = Some(parse_string_expr(&meta.value)?);
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "unsupported #[transcode(...)] variant attribute; expected `rename`",
                ));
            }
        }
    }
    Ok(out)
}

/// Parses and removes every `#[ai_chat(...)]` attribute.
pub(crate) fn take_chat_attrs(attrs: &mut Vec<Attribute>) -> syn::Result<ChatAttrs> {
    let mut out = ChatAttrs::default();
    let mut kept = Vec::with_capacity(attrs.len());
    for attr in attrs.drain(..) {
        if !attr.path().is_ident("ai_chat") {
            kept.push(attr);
            continue;
        }
        for meta in parse_meta_list(&attr)? {
            match meta {
                Meta::NameValue(meta) if meta.path.is_ident("model") => {
                    out.model = Some(parse_string_expr(&meta.value)?);
                }
                Meta::NameValue(meta) if meta.path.is_ident("description") => {
                    out.description = Some(parse_string_expr(&meta.value)?);
                }
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "unsupported #[ai_chat(...)] attribute; expected `model` or `description`",
                    ));
                }
            }
        }
    }
    *attrs = kept;
    Ok(out)
}

fn parse_setter(meta: &MetaList) -> syn::Result<SetterAttr> {
    let mut name = None;
    let mut ty = None;
    let mut with = None;
    let entries = meta.parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?;
    for entry in entries {
        match entry {
            Meta::NameValue(entry) if entry.path.is_ident("name") => {
                name = Some(parse_string_expr(&entry.value)?);
            }
            Meta::NameValue(entry) if entry.path.is_ident("ty") => {
                ty = Some(syn::parse_str::<Type>(&parse_string_expr(&entry.value)?)?);
            }
            Meta::NameValue(entry) if entry.path.is_ident("with") => {
                with = Some(syn::parse_str::<Path>(&parse_string_expr(&entry.value)?)?);
            }
            other => {
                return Err(syn::Error::new_spanned(
                    other,
                    "unsupported setter key; expected `name`, `ty` or `with`",
                ));
            }
        }
    }
    match (name, ty, with) {
        (Some(name), Some(ty), Some(with)) => Ok(SetterAttr { name, ty, with }),
        _ => Err(syn::Error::new_spanned(
            meta,
            "setter requires `name`, `ty` and `with`",
        )),
    }
}

fn transcode_metas(attrs: &[Attribute]) -> syn::Result<Vec<Meta>> {
    let mut metas = Vec::new();
    for attr in attrs.iter().filter(|attr| attr.path().is_ident("transcode")) {
        metas.extend(parse_meta_list(attr)?);
    }
    Ok(metas)
}

fn parse_meta_list(attr: &Attribute) -> syn::Result<Vec<Meta>> {
    Ok(attr
        .parse_args_with(Punctuated::<Meta, Token![,]>::parse_terminated)?
        .into_iter()
        .collect())
}

fn parse_string_expr(expr: &Expr) -> syn::Result<String> {
    match expr {
        Expr::Lit(ExprLit {
            lit: Lit::Str(s), ..
        }) => Ok(s.value()),
        _ => Err(syn::Error::new(
            expr.span(),
            "expected string literal; hint: wrap the value in quotes",
        )),
    }
}
