//! Event-related macros.
//!
//! This module contains:
//! - `#[derive(Event)]` - Implements `Event`, declaring the fields marked
//!   `#[event(parent)]` as direct supertypes, and `Extends` for each of them

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Data, DeriveInput, Field, Fields, Index, Member, parse_macro_input, spanned::Spanned};

/// Implementation of `#[derive(Event)]`.
pub fn derive_event_impl(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(expanded) => expanded.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let parents = match &input.data {
        Data::Struct(data) => parent_fields(&data.fields)?,
        Data::Enum(_) | Data::Union(_) => {
            // Only structs can embed a parent; other shapes are root events.
            if let Some(attr) = find_event_attrs(input) {
                return Err(syn::Error::new(
                    attr,
                    "`#[event(parent)]` is only supported on struct fields",
                ));
            }
            Vec::new()
        }
    };

    let supertypes = parents.iter().map(|(_, ty)| {
        quote! { ::eventlib::Supertype::of::<Self, #ty>() }
    });

    let extends = parents.iter().map(|(member, ty)| {
        quote! {
            impl #impl_generics ::eventlib::Extends<#ty> for #name #ty_generics #where_clause {
                fn upcast_mut(&mut self) -> &mut #ty {
                    &mut self.#member
                }
            }
        }
    });

    let supertypes_fn = (!parents.is_empty()).then(|| {
        quote! {
            fn supertypes() -> ::std::vec::Vec<::eventlib::Supertype> {
                ::std::vec![#(#supertypes),*]
            }
        }
    });

    Ok(quote! {
        impl #impl_generics ::eventlib::Event for #name #ty_generics #where_clause {
            #supertypes_fn
        }

        #(#extends)*
    })
}

/// The fields marked `#[event(parent)]`, in declaration order.
fn parent_fields(fields: &Fields) -> syn::Result<Vec<(Member, &syn::Type)>> {
    let mut parents = Vec::new();
    for (index, field) in fields.iter().enumerate() {
        if is_parent(field)? {
            let member = match &field.ident {
                Some(ident) => Member::Named(ident.clone()),
                None => Member::Unnamed(Index {
                    index: index as u32,
                    span: field.span(),
                }),
            };
            parents.push((member, &field.ty));
        }
    }
    Ok(parents)
}

fn is_parent(field: &Field) -> syn::Result<bool> {
    let mut parent = false;
    for attr in field.attrs.iter().filter(|attr| attr.path().is_ident("event")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("parent") {
                parent = true;
                Ok(())
            } else {
                Err(meta.error("expected `parent`"))
            }
        })?;
    }
    Ok(parent)
}

fn find_event_attrs(input: &DeriveInput) -> Option<proc_macro2::Span> {
    let fields: Vec<&Field> = match &input.data {
        Data::Enum(data) => data.variants.iter().flat_map(|v| v.fields.iter()).collect(),
        Data::Union(data) => data.fields.named.iter().collect(),
        Data::Struct(_) => Vec::new(),
    };
    fields
        .into_iter()
        .flat_map(|field| field.attrs.iter())
        .find(|attr| attr.path().is_ident("event"))
        .map(|attr| attr.span())
}
