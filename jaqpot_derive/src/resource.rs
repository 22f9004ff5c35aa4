//! Implementation of `#[derive(Resource)]`.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, DeriveInput, Lit, Meta, MetaNameValue};

/// Do the actual code generation for a `Resource`.
///
/// The generated impl refers to `Resource` and `MetaInfo` unqualified, so
/// both must be in scope wherever the derive is used, and the struct must
/// have a `meta: MetaInfo` field.
pub(crate) fn derive(ast: &DeriveInput) -> TokenStream {
    let name = &ast.ident;
    let (impl_generics, ty_generics, where_clause) = ast.generics.split_for_impl();
    let api_name = get_api_name(&ast.attrs);
    quote! {
        impl #impl_generics Resource for #name #ty_generics #where_clause {
            fn api_name() -> &'static str {
                #api_name
            }

            fn meta(&self) -> &MetaInfo {
                &self.meta
            }
        }
    }
}

/// Search for an `#[api_name = "my_resource"]` attribute and return
/// `"my_resource"` as a `Lit` value.
fn get_api_name(attrs: &[Attribute]) -> Lit {
    for attr in attrs {
        if !attr.path.is_ident("api_name") {
            continue;
        }
        let meta = attr
            .parse_meta()
            .expect("Invalid `api_name`, try #[api_name = \"my_resource\"]");
        match meta {
            Meta::NameValue(MetaNameValue { lit, .. }) => return lit,
            _ => panic!("Invalid `api_name`, try #[api_name = \"my_resource\"]"),
        }
    }
    panic!("Missing attribute `api_name`, try `#[api_name = \"...\"]`");
}
