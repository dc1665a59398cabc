//! Procedural macros for the `gensenc` crate.

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    parse_macro_input, parse_quote, Attribute, Data, DeriveInput, Fields,
    Generics, Index, Member, Type,
};

/// Derives `Reflect`, `Record`, `Encode`, and `Decode` for a struct.
///
/// The struct is classified as a `Record`: its fields are encoded back to
/// back in declaration order with no header. The field table, the encoding
/// code, and the decoding code are generated from the same field list, so
/// both directions always skip the same fields.
///
/// # Attributes
///
/// - `#[gensenc(skip)]` on a field hides it from the codec. It contributes no
///   bytes and keeps its value on decode.
/// - `#[gensenc(exported_only)]` on the struct hides every field that is not
///   declared `pub`.
/// - `#[gensenc(crate = path)]` on the struct sets the path to the `gensenc`
///   crate, `::gensenc` by default.
///
/// # Example
///
/// ```ignore
/// use gensenc::Record;
///
/// #[derive(Default, Record)]
/// #[gensenc(exported_only)]
/// pub struct Account {
///     pub id: u64,
///     pub name: String,
///     password_hash: [u8; 4],
/// }
/// ```
#[proc_macro_derive(Record, attributes(gensenc))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_record(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visibility {
    Introspectable,
    Hidden,
}

struct FieldInfo {
    member: Member,
    name: String,
    ty: Type,
    visibility: Visibility,
}

struct ContainerOptions {
    exported_only: bool,
    krate: syn::Path,
}

impl ContainerOptions {
    fn parse(attrs: &[Attribute]) -> syn::Result<Self> {
        let mut options =
            Self { exported_only: false, krate: parse_quote!(::gensenc) };

        for attr in attrs.iter().filter(|attr| attr.path().is_ident("gensenc"))
        {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("exported_only") {
                    options.exported_only = true;
                    Ok(())
                } else if meta.path.is_ident("crate") {
                    options.krate = meta.value()?.parse()?;
                    Ok(())
                } else {
                    Err(meta.error("unsupported `gensenc` container attribute"))
                }
            })?;
        }

        Ok(options)
    }
}

fn is_skipped(attrs: &[Attribute]) -> syn::Result<bool> {
    let mut skipped = false;

    for attr in attrs.iter().filter(|attr| attr.path().is_ident("gensenc")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                skipped = true;
                Ok(())
            } else {
                Err(meta.error("unsupported `gensenc` field attribute"))
            }
        })?;
    }

    Ok(skipped)
}

/// The single source of truth for which fields the codec touches.
fn collect_fields(
    fields: &Fields,
    options: &ContainerOptions,
) -> syn::Result<Vec<FieldInfo>> {
    fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let (member, name) = field.ident.as_ref().map_or_else(
                || (Member::Unnamed(Index::from(index)), index.to_string()),
                |ident| (Member::Named(ident.clone()), ident.to_string()),
            );

            let exported = matches!(field.vis, syn::Visibility::Public(_));
            let visibility = if is_skipped(&field.attrs)?
                || (options.exported_only && !exported)
            {
                Visibility::Hidden
            } else {
                Visibility::Introspectable
            };

            Ok(FieldInfo { member, name, ty: field.ty.clone(), visibility })
        })
        .collect()
}

fn expand_record(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let options = ContainerOptions::parse(&input.attrs)?;

    let fields = match &input.data {
        Data::Struct(data_struct) => {
            collect_fields(&data_struct.fields, &options)?
        }
        Data::Enum(_) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "enums have no record shape; only structs can derive `Record`",
            ))
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "unions have no record shape; only structs can derive `Record`",
            ))
        }
    };

    let reflect = expand_reflect(input, &fields, &options.krate);
    let encode = expand_encode(input, &fields, &options.krate);
    let decode = expand_decode(input, &fields, &options.krate);

    Ok(quote! {
        #reflect
        #encode
        #decode
    })
}

fn expand_reflect(
    input: &DeriveInput,
    fields: &[FieldInfo],
    krate: &syn::Path,
) -> proc_macro2::TokenStream {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) =
        input.generics.split_for_impl();

    let descriptors = fields.iter().map(|field| {
        let field_name = &field.name;
        let visibility = match field.visibility {
            Visibility::Introspectable => quote!(Introspectable),
            Visibility::Hidden => quote!(Hidden),
        };

        quote! {
            #krate::__internal::Field::new(
                #field_name,
                #krate::__internal::Visibility::#visibility,
            )
        }
    });

    quote! {
        impl #impl_generics #krate::__internal::Reflect
            for #name #ty_generics #where_clause
        {
            const SHAPE: #krate::__internal::Shape =
                #krate::__internal::Shape::Record;
        }

        impl #impl_generics #krate::__internal::Record
            for #name #ty_generics #where_clause
        {
            const FIELDS: &'static [#krate::__internal::Field] = &[
                #(#descriptors),*
            ];
        }
    }
}

/// Adds `ty: bound` for the type of every introspectable field.
fn bounded_generics(
    generics: &Generics,
    fields: &[FieldInfo],
    bound: &syn::Path,
) -> Generics {
    let mut generics = generics.clone();
    let where_clause = generics.make_where_clause();

    for field in
        fields.iter().filter(|field| field.visibility == Visibility::Introspectable)
    {
        let ty = &field.ty;
        where_clause.predicates.push(parse_quote!(#ty: #bound));
    }

    generics
}

fn expand_encode(
    input: &DeriveInput,
    fields: &[FieldInfo],
    krate: &syn::Path,
) -> proc_macro2::TokenStream {
    let name = &input.ident;
    let generics = bounded_generics(
        &input.generics,
        fields,
        &parse_quote!(#krate::__internal::Encode),
    );
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let steps = fields.iter().map(|field| {
        let member = &field.member;
        let field_name = &field.name;

        match field.visibility {
            Visibility::Introspectable => quote! {
                record.field(#field_name, &self.#member)?;
            },
            Visibility::Hidden => quote! {
                record.skip(#field_name);
            },
        }
    });

    let body = if fields.is_empty() {
        quote!(encoder.emit_record::<Self>(|_| ::core::result::Result::Ok(())))
    } else {
        quote! {
            encoder.emit_record::<Self>(|mut record| {
                #(#steps)*
                ::core::result::Result::Ok(())
            })
        }
    };

    quote! {
        impl #impl_generics #krate::__internal::Encode
            for #name #ty_generics #where_clause
        {
            fn encode<__W: ::std::io::Write>(
                &self,
                encoder: &mut #krate::__internal::Encoder<__W>,
            ) -> ::core::result::Result<(), #krate::__internal::Error> {
                #body
            }
        }
    }
}

fn expand_decode(
    input: &DeriveInput,
    fields: &[FieldInfo],
    krate: &syn::Path,
) -> proc_macro2::TokenStream {
    let name = &input.ident;
    let generics = bounded_generics(
        &input.generics,
        fields,
        &parse_quote!(#krate::__internal::Decode),
    );
    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();

    let steps = fields.iter().map(|field| {
        let member = &field.member;
        let field_name = &field.name;

        match field.visibility {
            Visibility::Introspectable => quote! {
                record.field(#field_name, &mut self.#member)?;
            },
            Visibility::Hidden => quote! {
                record.skip(#field_name);
            },
        }
    });

    let body = if fields.is_empty() {
        quote!(decoder.expect_record::<Self>(|_| ::core::result::Result::Ok(())))
    } else {
        quote! {
            decoder.expect_record::<Self>(|mut record| {
                #(#steps)*
                ::core::result::Result::Ok(())
            })
        }
    };

    quote! {
        impl #impl_generics #krate::__internal::Decode
            for #name #ty_generics #where_clause
        {
            fn decode<__R: ::std::io::Read>(
                &mut self,
                decoder: &mut #krate::__internal::Decoder<__R>,
            ) -> ::core::result::Result<(), #krate::__internal::Error> {
                #body
            }
        }
    }
}
