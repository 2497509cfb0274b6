use std::collections::BTreeMap;

use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use syn::{
    parse::{Parse, ParseStream},
    parse_macro_input,
    spanned::Spanned,
    Attribute, DeriveInput, Ident, Token,
};

const MESSAGE: &str = "message";
const MARSHAL: &str = "marshal";
const UNMARSHAL: &str = "unmarshal";
const KEYS: [&str; 2] = [MARSHAL, UNMARSHAL];

/// Derive `rpc_service::Message` from inherent methods of the type.
///
/// Without an attribute the type must have a method `fn marshal(&self) -> impl Into<Bytes>`
/// and an associated function `fn unmarshal(&[u8]) -> Result<Self, E>`. Both are
/// registered under their own names.
///
/// With `#[message(marshal = encode, unmarshal = decode)]` other methods are
/// used, and registered under those names. Only the listed capabilities are
/// registered, so `#[message()]` declares a type without any.
#[proc_macro_derive(Message, attributes(message))]
pub fn derive_message(item: TokenStream) -> TokenStream {
    let input = parse_macro_input!(item as DeriveInput);
    match generate_message_impl(&input) {
        Ok(tokens) => tokens.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

fn generate_message_impl(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let methods = message_methods(&input.attrs, input.span())?;
    let ident = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let marshal = methods.get(MARSHAL).map(|method| {
        let name = method.to_string();
        quote! { .marshal(#name, Self::#method) }
    });
    let unmarshal = methods.get(UNMARSHAL).map(|method| {
        let name = method.to_string();
        quote! { .unmarshal(#name, Self::#method) }
    });

    Ok(quote! {
        impl #impl_generics ::rpc_service::Message for #ident #ty_generics #where_clause {
            fn capabilities() -> ::rpc_service::Capabilities {
                ::rpc_service::Capabilities::new()
                    #marshal
                    #unmarshal
            }
        }
    })
}

/// Capability to method mapping from the `message` attribute, or the defaults
fn message_methods(attrs: &[Attribute], span: Span) -> syn::Result<BTreeMap<String, Ident>> {
    let mut message_attrs = attrs.iter().filter(|attr| attr.path.is_ident(MESSAGE));
    let Some(attr) = message_attrs.next() else {
        return Ok(KEYS
            .iter()
            .map(|key| (key.to_string(), Ident::new(key, span)))
            .collect());
    };
    if let Some(extra) = message_attrs.next() {
        return Err(syn::Error::new(
            extra.span(),
            "Only one message attribute is allowed",
        ));
    }
    let args = attr.parse_args::<NamedMethodArgs>()?;
    args.check_known(attr.span())?;
    Ok(args.methods)
}

struct NamedMethodArgs {
    methods: BTreeMap<String, Ident>,
}

impl NamedMethodArgs {
    /// Fail if there are any unknown arguments
    fn check_known(&self, span: Span) -> syn::Result<()> {
        let unknown: Vec<_> = self
            .methods
            .keys()
            .filter(|key| !KEYS.contains(&key.as_str()))
            .collect();
        if unknown.is_empty() {
            Ok(())
        } else {
            Err(syn::Error::new(
                span,
                format!("Unknown arguments provided: {unknown:?}"),
            ))
        }
    }
}

/// Parse the message args as a comma separated list of capability=method pairs
impl Parse for NamedMethodArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut methods = BTreeMap::new();

        loop {
            if input.is_empty() {
                break;
            }

            let key: Ident = input.parse()?;
            let _: Token![=] = input.parse()?;
            let value: Ident = input.parse()?;

            if methods.insert(key.to_string(), value).is_some() {
                return Err(syn::Error::new(
                    key.span(),
                    format!("{key} is given more than once"),
                ));
            }

            if !input.peek(Token![,]) {
                break;
            }
            let _: Token![,] = input.parse()?;
        }

        Ok(NamedMethodArgs { methods })
    }
}
