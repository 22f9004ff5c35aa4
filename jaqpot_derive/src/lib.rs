// `proc_macro` is built into the compiler.
extern crate proc_macro;

mod resource;

/// Derive boilerplate code for `Resource`: `api_name()` and `meta()`.
#[proc_macro_derive(Resource, attributes(api_name))]
pub fn resource_derive(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    // We can only report errors via a panic here, so a malformed input
    // becomes a compile error at the derive site.
    let input = syn::parse(input).unwrap();
    let gen = resource::derive(&input);
    gen.into()
}
