use proc_macro2::TokenStream;
use quote::quote;
use syn::{Data, DataEnum, DataStruct, DeriveInput, Fields, Ident, Type};

use crate::attrs::{parse_container_attrs, parse_field_attrs, parse_variant_attrs};
use crate::runtime_path::resolve_interfaice_path;

pub(crate) fn expand(input: &DeriveInput) -> syn::Result<TokenStream> {
    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Transcode cannot be derived for generic types; hint: register a CustomRule instead",
        ));
    }
    match &input.data {
        Data::Struct(data) => expand_struct(input, data),
        Data::Enum(data) => expand_enum(input, data),
        Data::Union(_) => Err(syn::Error::new_spanned(
            input,
            "Transcode does not support `union` items; hint: use a struct or enum instead",
        )),
    }
}

struct FieldSpec<'a> {
    ident: &'a Ident,
    ty: &'a Type,
    key: String,
    default: bool,
    skip: bool,
}

impl FieldSpec<'_> {
    fn is_required(&self) -> bool {
        !self.skip && !self.default && !is_option(self.ty)
    }
}

fn expand_struct(input: &DeriveInput, data: &DataStruct) -> syn::Result<TokenStream> {
    let rt = resolve_interfaice_path()?;
    let ident = &input.ident;
    let type_name = ident.to_string();
    let container = parse_container_attrs(&input.attrs)?;

    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &data.fields,
            "Transcode structs need named fields",
        ));
    };

    let mut fields = Vec::with_capacity(named.named.len());
    for field in &named.named {
        let attrs = parse_field_attrs(&field.attrs)?;
        let Some(field_ident) = field.ident.as_ref() else {
            continue;
        };
        fields.push(FieldSpec {
            ident: field_ident,
            ty: &field.ty,
            key: attrs.rename.unwrap_or_else(|| field_ident.to_string()),
            default: attrs.default,
            skip: attrs.skip,
        });
    }
    let declared: Vec<&FieldSpec> = fields.iter().filter(|field| !field.skip).collect();

    let constructors: Vec<Vec<String>> = if container.constructors.is_empty() {
        vec![
            declared
                .iter()
                .filter(|field| field.is_required())
                .map(|field| field.key.clone())
                .collect(),
        ]
    } else {
        container
            .constructors
            .iter()
            .map(|parameters| {
                parameters
                    .iter()
                    .map(|parameter| {
                        declared
                            .iter()
                            .find(|field| field.ident == parameter)
                            .map(|field| field.key.clone())
                            .ok_or_else(|| {
                                syn::Error::new_spanned(
                                    parameter,
                                    format!("`{parameter}` is not a transcoded field of `{type_name}`"),
                                )
                            })
                    })
                    .collect::<syn::Result<Vec<_>>>()
            })
            .collect::<syn::Result<_>>()?
    };

    let schema_fields = declared.iter().map(|field| {
        let key = &field.key;
        let ty = field.ty;
        quote! { .field(#key, <#ty as #rt::Describe>::descriptor) }
    });
    let schema_constructors = constructors.iter().map(|parameters| {
        let arity = parameters.len();
        quote! { .constructor::<[&'static str; #arity], &'static str>([#(#parameters),*]) }
    });
    let schema_setters = container.setters.iter().map(|setter| {
        let name = &setter.name;
        let ty = &setter.ty;
        let with = &setter.with;
        quote! { .setter(#name, <#ty as #rt::Describe>::descriptor, #with) }
    });
    let supertypes = &container.supertypes;

    let encode_fields = declared.iter().map(|field| {
        let key = &field.key;
        let field_ident = field.ident;
        quote! {
            fields.insert(::std::string::String::from(#key), #rt::Encode::to_value(&self.#field_ident));
        }
    });

    let decode_fields = fields.iter().map(|field| {
        let key = &field.key;
        let field_ident = field.ident;
        if field.skip {
            quote! { #field_ident: ::std::default::Default::default() }
        } else if field.default {
            quote! { #field_ident: #rt::core::value::take_field_or_default(&mut fields, #key)? }
        } else {
            quote! { #field_ident: #rt::core::value::take_field(&mut fields, #type_name, #key)? }
        }
    });

    Ok(quote! {
        impl #rt::Describe for #ident {
            fn descriptor() -> #rt::TypeDescriptor {
                static SCHEMA: ::std::sync::LazyLock<::std::sync::Arc<#rt::ObjectSchema>> =
                    ::std::sync::LazyLock::new(|| {
                        ::std::sync::Arc::new(
                            #rt::ObjectSchema::builder(concat!(module_path!(), "::", #type_name))
                                #(#schema_fields)*
                                #(#schema_constructors)*
                                #(#schema_setters)*
                                .build(),
                        )
                    });
                #rt::TypeDescriptor::object(::std::sync::Arc::clone(&SCHEMA))
                    #(.with_supertype(#supertypes))*
            }
        }

        impl #rt::Encode for #ident {
            fn to_value(&self) -> #rt::Value {
                let mut fields = #rt::ObjectFields::new();
                #(#encode_fields)*
                #rt::Value::Object(fields)
            }
        }

        impl #rt::Transcode for #ident {
            fn from_value(value: #rt::Value) -> ::std::result::Result<Self, #rt::DecodeError> {
                let mut fields = #rt::core::value::expect_object(value)?;
                ::std::result::Result::Ok(Self {
                    #(#decode_fields),*
                })
            }
        }
    })
}

fn expand_enum(input: &DeriveInput, data: &DataEnum) -> syn::Result<TokenStream> {
    let rt = resolve_interfaice_path()?;
    let ident = &input.ident;
    let type_name = ident.to_string();
    let container = parse_container_attrs(&input.attrs)?;
    if !container.constructors.is_empty() || !container.setters.is_empty() {
        return Err(syn::Error::new_spanned(
            ident,
            "constructors and setters only apply to structs",
        ));
    }
    if data.variants.is_empty() {
        return Err(syn::Error::new_spanned(
            ident,
            "Transcode enums need at least one variant",
        ));
    }

    let mut variant_idents = Vec::with_capacity(data.variants.len());
    let mut names = Vec::with_capacity(data.variants.len());
    for variant in &data.variants {
        if !matches!(variant.fields, Fields::Unit) {
            return Err(syn::Error::new_spanned(
                variant,
                "Transcode enums support unit variants only",
            ));
        }
        let attrs = parse_variant_attrs(&variant.attrs)?;
        names.push(attrs.rename.unwrap_or_else(|| variant.ident.to_string()));
        variant_idents.push(&variant.ident);
    }
    let supertypes = &container.supertypes;

    Ok(quote! {
        impl #rt::Describe for #ident {
            fn descriptor() -> #rt::TypeDescriptor {
                static SCHEMA: ::std::sync::LazyLock<::std::sync::Arc<#rt::EnumSchema>> =
                    ::std::sync::LazyLock::new(|| {
                        ::std::sync::Arc::new(#rt::EnumSchema::new(
                            concat!(module_path!(), "::", #type_name),
                            [#(#names),*],
                        ))
                    });
                #rt::TypeDescriptor::enumeration(::std::sync::Arc::clone(&SCHEMA))
                    #(.with_supertype(#supertypes))*
            }
        }

        impl #rt::Encode for #ident {
            fn to_value(&self) -> #rt::Value {
                let name = match self {
                    #(Self::#variant_idents => #names,)*
                };
                #rt::Value::Enum(::std::string::String::from(name))
            }
        }

        impl #rt::Transcode for #ident {
            fn from_value(value: #rt::Value) -> ::std::result::Result<Self, #rt::DecodeError> {
                let variant = #rt::core::value::expect_variant(value)?;
                match variant.as_str() {
                    #(#names => ::std::result::Result::Ok(Self::#variant_idents),)*
                    other => ::std::result::Result::Err(#rt::DecodeError::UnknownVariant {
                        enum_name: ::std::string::String::from(concat!(module_path!(), "::", #type_name)),
                        got: ::std::string::String::from(other),
                        valid_variants: ::std::vec![#(::std::string::String::from(#names)),*],
                    }),
                }
            }
        }
    })
}

/// Whether the field type is spelled `Option<..>`.
fn is_option(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Option"),
        _ => false,
    }
}
