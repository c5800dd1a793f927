//! `#[derive(Row)]`: generates `RowType` (column metadata) and `RowFields`
//! (get/set by column index) for a user-declared row struct.
//!
//! Attributes on a struct/field are parsed and expanded via `quote!` into
//! the `RowType`/`RowFields` trait impls `Table` is generic over.
//!
//! A struct using this derive must have exactly one field marked
//! `#[row(state)]`, of type `::rowdb::state::RowState`, which backs the
//! generated `RowFields::state`/`state_mut`. Every other field becomes a
//! column, in declaration order; `#[row(key)]` marks primary key columns,
//! `#[row(automatic)]` marks an automatic-key column, `Option<T>` fields are
//! nullable, and `#[row(name = "...")]` overrides the column name.
//!
//! Alternate keys and secondary indexes aren't expressible through field
//! attributes here -- they're a property of the whole row type, not one
//! field -- so a struct that needs them implements
//! `RowType::alternate_keys`/`secondary_indexes` by hand alongside this
//! derive, which only ever emits the default (empty) implementations for
//! those two methods.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Data, DeriveInput, Fields, Type};

#[proc_macro_derive(Row, attributes(row))]
pub fn derive_row(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match expand(input) {
        Ok(ts) => ts.into(),
        Err(e) => e.to_compile_error().into(),
    }
}

struct FieldColumn {
    ident: syn::Ident,
    index: usize,
    name: String,
    primary_key: bool,
    automatic: bool,
    null_low: bool,
    nullable: bool,
    variant: syn::Ident,
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let struct_name = &input.ident;
    let data = match &input.data {
        Data::Struct(s) => s,
        _ => return Err(syn::Error::new_spanned(&input, "#[derive(Row)] only supports structs")),
    };
    let fields = match &data.fields {
        Fields::Named(f) => &f.named,
        _ => return Err(syn::Error::new_spanned(&input, "#[derive(Row)] requires named fields")),
    };

    let mut state_field: Option<syn::Ident> = None;
    let mut columns: Vec<FieldColumn> = Vec::new();

    for field in fields {
        let ident = field.ident.clone().expect("named field");
        let mut is_state = false;
        let mut primary_key = false;
        let mut automatic = false;
        let mut null_low = false;
        let mut rename: Option<String> = None;

        for attr in &field.attrs {
            if !attr.path().is_ident("row") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("state") {
                    is_state = true;
                } else if meta.path.is_ident("key") {
                    primary_key = true;
                } else if meta.path.is_ident("automatic") {
                    automatic = true;
                } else if meta.path.is_ident("null_low") {
                    null_low = true;
                } else if meta.path.is_ident("name") {
                    let value = meta.value()?;
                    let lit: syn::LitStr = value.parse()?;
                    rename = Some(lit.value());
                }
                Ok(())
            })?;
        }

        if is_state {
            state_field = Some(ident);
            continue;
        }

        let (nullable, inner_ty) = unwrap_option(&field.ty);
        let variant = value_variant(&inner_ty)?;
        let name = rename.unwrap_or_else(|| ident.to_string());
        columns.push(FieldColumn {
            ident,
            index: 0,
            name,
            primary_key,
            automatic,
            null_low,
            nullable,
            variant,
        });
    }

    for (i, c) in columns.iter_mut().enumerate() {
        c.index = i;
    }

    let state_field = state_field.ok_or_else(|| {
        syn::Error::new_spanned(
            &input,
            "#[derive(Row)] requires exactly one field marked #[row(state)] of type ::rowdb::state::RowState",
        )
    })?;

    let type_name_str = struct_name.to_string();
    let num_columns = columns.len();

    let column_decls = columns.iter().map(|c| {
        let name = &c.name;
        let variant = &c.variant;
        let primary_key = c.primary_key;
        let automatic = c.automatic;
        let mut flags = quote!(::rowdb::codec::TypeFlags::empty());
        if c.nullable {
            flags = quote!(#flags.union(::rowdb::codec::TypeFlags::NULLABLE));
        }
        if c.null_low {
            flags = quote!(#flags.union(::rowdb::codec::TypeFlags::NULL_LOW));
        }
        quote! {
            ::rowdb::schema::ColumnDecl {
                name: #name,
                kind: ::rowdb::schema::TypeKind::#variant,
                flags: #flags,
                primary_key: #primary_key,
                automatic: #automatic,
            }
        }
    });

    let get_value_arms = columns.iter().map(|c| {
        let idx = c.index;
        let ident = &c.ident;
        let variant = &c.variant;
        if c.nullable {
            quote! { #idx => ::rowdb::value::Value::#variant(self.#ident.clone()), }
        } else {
            quote! { #idx => ::rowdb::value::Value::#variant(Some(self.#ident.clone())), }
        }
    });

    let set_value_arms = columns.iter().map(|c| {
        let idx = c.index;
        let ident = &c.ident;
        let variant = &c.variant;
        if c.nullable {
            quote! {
                #idx => {
                    if let ::rowdb::value::Value::#variant(v) = value {
                        self.#ident = v;
                    }
                }
            }
        } else {
            quote! {
                #idx => {
                    if let ::rowdb::value::Value::#variant(Some(v)) = value {
                        self.#ident = v;
                    }
                }
            }
        }
    });

    let expanded = quote! {
        impl ::rowdb::schema::RowType for #struct_name {
            fn type_name() -> &'static str {
                #type_name_str
            }

            fn columns() -> &'static [::rowdb::schema::ColumnDecl] {
                static COLUMNS: [::rowdb::schema::ColumnDecl; #num_columns] = [
                    #(#column_decls),*
                ];
                &COLUMNS
            }
        }

        impl ::rowdb::row::RowFields for #struct_name {
            fn get_value(&self, column: usize) -> ::rowdb::value::Value {
                match column {
                    #(#get_value_arms)*
                    _ => panic!("column index {column} out of range for {}", #type_name_str),
                }
            }

            fn set_value(&mut self, column: usize, value: ::rowdb::value::Value) {
                match column {
                    #(#set_value_arms)*
                    _ => panic!("column index {column} out of range for {}", #type_name_str),
                }
                let is_null = ::rowdb::row::RowFields::get_value(self, column).is_null();
                self.#state_field.set(
                    column,
                    if is_null {
                        ::rowdb::state::UNSET
                    } else {
                        ::rowdb::state::DIRTY
                    },
                );
            }

            fn state(&self) -> &::rowdb::state::RowState {
                &self.#state_field
            }

            fn state_mut(&mut self) -> &mut ::rowdb::state::RowState {
                &mut self.#state_field
            }
        }
    };

    Ok(expanded)
}

fn unwrap_option(ty: &Type) -> (bool, Type) {
    if let Type::Path(p) = ty {
        if let Some(seg) = p.path.segments.last() {
            if seg.ident == "Option" {
                if let syn::PathArguments::AngleBracketed(args) = &seg.arguments {
                    if let Some(syn::GenericArgument::Type(inner)) = args.args.first() {
                        return (true, inner.clone());
                    }
                }
            }
        }
    }
    (false, ty.clone())
}

fn value_variant(ty: &Type) -> syn::Result<syn::Ident> {
    let Type::Path(p) = ty else {
        return Err(syn::Error::new_spanned(ty, "unsupported column type"));
    };
    let Some(seg) = p.path.segments.last() else {
        return Err(syn::Error::new_spanned(ty, "unsupported column type"));
    };
    let name = match seg.ident.to_string().as_str() {
        "bool" => "Bool",
        "i8" => "I8",
        "i16" => "I16",
        "i32" => "I32",
        "i64" => "I64",
        "u8" => "U8",
        "u16" => "U16",
        "u32" => "U32",
        "u64" => "U64",
        "f32" => "F32",
        "f64" => "F64",
        "String" => "Str",
        "Vec" => "Bytes",
        other => {
            return Err(syn::Error::new_spanned(ty, format!("unsupported column type `{other}`")));
        }
    };
    Ok(syn::Ident::new(name, proc_macro2::Span::call_site()))
}
