//! Derive macro describing record types for the schema reflector.
//!
//! This crate provides the `#[derive(Model)]` macro, which implements
//! `sqlweave_core::schema::Reflect` and `sqlweave_core::schema::Model` for a
//! struct with named fields.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, LitStr};

/// Derives `Reflect` and `Model` for a struct.
///
/// # Attributes
///
/// - `#[model(table = "table_name")]` - Overrides the table name produced by
///   the naming strategy
/// - `#[orm("tableName:table_name")]` - Struct-level tag string
///
/// # Field Attributes
///
/// - `#[orm("column:name;size:256;not null")]` - The field's tag string;
///   repeated attributes are joined with `;`
/// - `#[orm(anonymous)]` - Flattens the field's struct into the owner, the
///   way an embedded struct is
/// - `#[orm(name = "ID")]` - Overrides the schema field name (defaults to the
///   field ident converted with initialisms restored, `user_id` -> `UserID`)
/// - `#[orm(skip)]` - Leaves the field out of the description
///
/// # Example
///
/// ```ignore
/// #[derive(Model)]
/// #[model(table = "people")]
/// struct User {
///     id: u64,
///     #[orm("size:64;not null")]
///     name: String,
///     pets: Vec<Pet>,
/// }
/// ```
#[proc_macro_derive(Model, attributes(model, orm))]
pub fn derive_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    derive_model_impl(input)
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}

fn derive_model_impl(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let model_name = struct_name.to_string();

    if input.generics.params.iter().next().is_some() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Model derive does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "Model derive only supports structs with named fields",
                ));
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input,
                "Model derive only supports structs",
            ));
        }
    };

    let model_attrs = parse_model_attrs(&input.attrs)?;

    let mut field_descriptions: Vec<TokenStream2> = Vec::new();
    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let attrs = parse_field_attrs(&field.attrs)?;
        if attrs.skip {
            continue;
        }

        let field_type = &field.ty;
        let tag = attrs.tag.join(";");
        let name = match attrs.name {
            Some(name) => quote! { #name },
            None => {
                let raw = ident.to_string();
                let raw = raw.strip_prefix("r#").unwrap_or(&raw).to_string();
                quote! { &::sqlweave_core::naming::to_schema_name(#raw) }
            }
        };
        let anonymous = if attrs.anonymous {
            quote! { .anonymous() }
        } else {
            quote! {}
        };

        field_descriptions.push(quote! {
            ::sqlweave_core::schema::StructField::new(
                #name,
                <#field_type as ::sqlweave_core::schema::Reflect>::kind(),
                #tag,
            )#anonymous
        });
    }

    let table_name = match &model_attrs.table {
        Some(table) => quote! { ::std::option::Option::Some(::std::string::String::from(#table)) },
        None => quote! { ::std::option::Option::None },
    };
    let struct_tag = model_attrs.tag.join(";");

    let expanded = quote! {
        impl ::sqlweave_core::schema::Reflect for #struct_name {
            fn kind() -> ::sqlweave_core::schema::Kind {
                ::sqlweave_core::schema::Kind::Struct(
                    ::sqlweave_core::schema::ModelRef::of::<Self>(),
                )
            }
        }

        impl ::sqlweave_core::schema::Model for #struct_name {
            fn model_name() -> &'static str {
                #model_name
            }

            fn model_type() -> ::sqlweave_core::schema::ModelType {
                ::sqlweave_core::schema::ModelType {
                    name: ::std::string::String::from(#model_name),
                    table_name: #table_name,
                    tag: ::std::string::String::from(#struct_tag),
                    fields: ::std::vec![#(#field_descriptions),*],
                }
            }
        }
    };

    Ok(expanded)
}

#[derive(Default)]
struct ModelAttrs {
    table: Option<String>,
    tag: Vec<String>,
}

#[derive(Default)]
struct FieldAttrs {
    tag: Vec<String>,
    name: Option<String>,
    anonymous: bool,
    skip: bool,
}

fn parse_model_attrs(attrs: &[Attribute]) -> syn::Result<ModelAttrs> {
    let mut result = ModelAttrs::default();

    for attr in attrs {
        if attr.path().is_ident("model") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("table") {
                    let value: LitStr = meta.value()?.parse()?;
                    result.table = Some(value.value());
                    Ok(())
                } else {
                    Err(meta.error("unsupported model attribute"))
                }
            })?;
        } else if attr.path().is_ident("orm") {
            let value: LitStr = attr.parse_args()?;
            result.tag.push(value.value());
        }
    }

    Ok(result)
}

fn parse_field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut result = FieldAttrs::default();

    for attr in attrs.iter().filter(|a| a.path().is_ident("orm")) {
        // A string literal is a tag; anything else is a list of flags.
        if let Ok(value) = attr.parse_args::<LitStr>() {
            result.tag.push(value.value());
            continue;
        }

        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("anonymous") {
                result.anonymous = true;
            } else if meta.path.is_ident("skip") {
                result.skip = true;
            } else if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                result.name = Some(value.value());
            } else {
                return Err(meta.error("unsupported orm attribute"));
            }
            Ok(())
        })?;
    }

    Ok(result)
}
