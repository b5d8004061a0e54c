//! Derive macros for `kissrpc`.
//!
//! - `#[derive(Wire)]` turns a struct with named fields into a wire type. `pub` fields are
//!   transmitted, every other field is hidden and rebuilt from `Default` on decode.
//! - `#[derive(Service)]` turns a struct of `pub` `Func<..>` fields into a service
//!   declaration, registered and bound as `<Struct>.<field>`.
//!
//! Generated code refers to the runtime through `::kissrpc`, so the runtime crate must be
//! a direct dependency of the deriving crate.

use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::Data;
use syn::DeriveInput;
use syn::Error;
use syn::Fields;
use syn::FieldsNamed;
use syn::LitStr;
use syn::Type;
use syn::Visibility;
use syn::parse_macro_input;
use syn::spanned::Spanned;

/// Implements `kissrpc::Wire` and `kissrpc::Outputs` for a struct with named fields.
///
/// The wire name defaults to the struct identifier; override it with
/// `#[wire(name = "geo.Point")]`.
#[proc_macro_derive(Wire, attributes(wire))]
pub fn derive_wire(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_wire(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

/// Implements `kissrpc::Service` for a struct whose `pub` fields are `Func<..>` slots.
///
/// The service name defaults to the struct identifier; override it with
/// `#[service(name = "Arith")]`.
#[proc_macro_derive(Service, attributes(service))]
pub fn derive_service(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand_service(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

fn expand_wire(input: DeriveInput) -> Result<proc_macro2::TokenStream, Error> {
    let ident = &input.ident;
    let fields = named_fields(&input, "Wire")?;
    let name = name_override(&input, "wire")?.unwrap_or_else(|| ident.to_string());

    let mut field_types = Vec::new();
    let mut into_fields = Vec::new();
    let mut from_fields = Vec::new();

    for field in &fields.named {
        let Some(field_ident) = &field.ident else {
            continue;
        };
        let field_name = field_ident.to_string();
        let ty = &field.ty;

        if matches!(field.vis, Visibility::Public(_)) {
            field_types.push(quote! {
                ::kissrpc::Field::exported(#field_name, <#ty as ::kissrpc::Wire>::wire_type())
            });
            into_fields.push(quote! {
                (#field_name.to_owned(), ::kissrpc::Wire::into_value(self.#field_ident))
            });
            from_fields.push(quote! {
                #field_ident: fields.take::<#ty>(#field_name)?
            });
        } else {
            field_types.push(quote! { ::kissrpc::Field::hidden(#field_name) });
            from_fields.push(quote! {
                #field_ident: ::core::default::Default::default()
            });
        }
    }

    Ok(quote! {
        impl ::kissrpc::Wire for #ident {
            fn wire_type() -> ::kissrpc::Type {
                ::kissrpc::Type::Struct(::kissrpc::StructType {
                    name: #name.to_owned(),
                    fields: vec![#(#field_types),*],
                })
            }

            fn into_value(self) -> ::kissrpc::Value {
                ::kissrpc::Value::Struct(vec![#(#into_fields),*])
            }

            fn from_value(value: ::kissrpc::Value) -> ::kissrpc::Result<Self> {
                let mut fields = ::kissrpc::StructFields::new(#name, value)?;
                Ok(Self { #(#from_fields),* })
            }
        }

        impl ::kissrpc::Outputs for #ident {
            fn types() -> ::std::vec::Vec<::kissrpc::Type> {
                vec![<Self as ::kissrpc::Wire>::wire_type()]
            }

            fn into_reply(
                self,
            ) -> ::core::result::Result<::std::vec::Vec<::kissrpc::Dynamic>, ::kissrpc::WireError> {
                Ok(vec![::kissrpc::Dynamic::new(self)])
            }

            fn from_reply(values: ::std::vec::Vec<::kissrpc::Dynamic>) -> ::kissrpc::Result<Self> {
                ::kissrpc::func::single_from_reply(values)
            }
        }
    })
}

fn expand_service(input: DeriveInput) -> Result<proc_macro2::TokenStream, Error> {
    let ident = &input.ident;
    let fields = named_fields(&input, "Service")?;
    let name = name_override(&input, "service")?.unwrap_or_else(|| ident.to_string());

    let mut registers = Vec::new();
    let mut binds = Vec::new();

    for field in &fields.named {
        let Some(field_ident) = &field.ident else {
            continue;
        };
        if !matches!(field.vis, Visibility::Public(_)) || !is_func(&field.ty) {
            continue;
        }
        let method = format!("{}.{}", name, field_ident);
        registers.push(quote! { table.add(#method, self.#field_ident); });
        binds.push(quote! { binder.bind(#method, &mut self.#field_ident)?; });
    }

    if registers.is_empty() {
        return Err(Error::new(
            ident.span(),
            "#[derive(Service)] needs at least one `pub` field of type `Func<..>`",
        ));
    }

    Ok(quote! {
        impl ::kissrpc::Service for #ident {
            const NAME: &'static str = #name;

            fn register(self, table: &mut ::kissrpc::MethodTable) {
                #(#registers)*
            }

            fn bind(&mut self, binder: &::kissrpc::Binder) -> ::kissrpc::Result<()> {
                #(#binds)*
                Ok(())
            }
        }
    })
}

fn named_fields<'a>(input: &'a DeriveInput, derive: &str) -> Result<&'a FieldsNamed, Error> {
    if !input.generics.params.is_empty() {
        return Err(Error::new(
            input.generics.span(),
            format!("#[derive({derive})] does not support generic structs"),
        ));
    }
    match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => Ok(fields),
            other => Err(Error::new(
                other.span(),
                format!("#[derive({derive})] requires named fields"),
            )),
        },
        _ => Err(Error::new(
            Span::call_site(),
            format!("#[derive({derive})] only supports structs"),
        )),
    }
}

/// Reads `#[<attr>(name = "...")]` from the struct attributes.
fn name_override(input: &DeriveInput, attr: &str) -> Result<Option<String>, Error> {
    let mut name = None;
    for a in input.attrs.iter().filter(|a| a.path().is_ident(attr)) {
        a.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                if lit.value().is_empty() {
                    return Err(meta.error("name must not be empty"));
                }
                name = Some(lit.value());
                Ok(())
            } else {
                Err(meta.error(format!("unsupported {attr} attribute")))
            }
        })?;
    }
    Ok(name)
}

/// True when the last path segment of the type is `Func`.
fn is_func(ty: &Type) -> bool {
    match ty {
        Type::Path(path) => path
            .path
            .segments
            .last()
            .is_some_and(|segment| segment.ident == "Func"),
        _ => false,
    }
}
