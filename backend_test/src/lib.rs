use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{parse_macro_input, parse_quote, spanned::Spanned, FnArg, Ident, ItemFn, Pat, Type};

/// Run an asynchronous test against a local rocket backed by a fresh
/// in-memory store, injecting dependencies by parameter type.
///
/// Injectable dependencies are [`rocket::local::asynchronous::Client`],
/// `crate::model::store::memory::MemoryStore` (the same store the client
/// reads from), and [`rocket::http::Header`], an `Authorization` header for
/// the user named in the attribute: `#[backend_test(voter)]` or
/// `#[backend_test(admin)]`.
#[proc_macro_attribute]
pub fn backend_test(args: TokenStream, input: TokenStream) -> TokenStream {
    let mut item_fn = parse_macro_input!(input as ItemFn);
    let role = parse_macro_input!(args as Option<Ident>);

    // Work out which user to sign a token for, if any.
    let user = match &role {
        Some(role) if role == "voter" => {
            Some(quote! { crate::model::api::auth::CurrentUser::voter_example() })
        }
        Some(role) if role == "admin" => {
            Some(quote! { crate::model::api::auth::CurrentUser::admin_example() })
        }
        Some(role) => {
            return syn::Error::new(role.span(), "Expected `voter` or `admin`")
                .into_compile_error()
                .into();
        }
        None => None,
    };

    // Extract the injected arguments and reject invalid function signatures.
    let test_args = match check_sig(&mut item_fn, user.is_some()) {
        Ok(args) => args,
        Err(err) => {
            return err.into_compile_error().into();
        }
    };

    // Rename the future so the test can have its original name.
    let name = item_fn.sig.ident.clone();
    let new_name = format_ident!("{}_fut", name);
    item_fn.sig.ident = new_name.clone();

    let maybe_auth = user
        .map(|user| {
            quote! {
                let auth_header = {
                    let config = rocket_client
                        .rocket()
                        .state::<crate::config::Config>()
                        .unwrap();
                    crate::model::api::auth::issue::bearer_for(&#user, config)
                };
            }
        })
        .unwrap_or_default();

    // Rewrite the test function.
    quote! {
        #[rocket::async_test]
        async fn #name() {
            /// The test itself.
            #item_fn

            // Test setup.
            let store = crate::model::store::memory::MemoryStore::new();
            let rocket_client = rocket::local::asynchronous::Client::tracked(
                crate::rocket_for_store(
                    crate::config::test_figment(),
                    crate::model::store::Gateway::new(store.clone()),
                ),
            )
            .await
            .unwrap();

            #maybe_auth

            #new_name(#(#test_args),*).await;
        }
    }
    .into()
}

/// Ensure the wrapped test is async, map parameters to the values to inject,
/// and reject unknown parameters.
fn check_sig(item_fn: &mut ItemFn, has_user: bool) -> Result<Vec<TokenStream2>, syn::Error> {
    if item_fn.sig.asyncness.is_none() {
        return Err(syn::Error::new(
            item_fn.sig.span(),
            "Test must be marked `async`",
        ));
    }

    let mut has_client = false;
    let mut has_store = false;
    let mut has_header = false;
    let mut args = vec![];

    for input in item_fn.sig.inputs.iter_mut() {
        let span = input.span();
        if let FnArg::Typed(pat_type) = input {
            if let Pat::Ident(_) = &*pat_type.pat {
                let type_ident = match &*pat_type.ty {
                    Type::Path(type_path) => type_path.path.segments.last().map(|s| s.ident.clone()),
                    _ => None,
                };
                match type_ident {
                    Some(ident) if ident == "Client" => {
                        if has_client {
                            return Err(syn::Error::new(span, "Test cannot accept more than one `rocket::local::asynchronous::Client`"));
                        }
                        has_client = true;
                        args.push(quote! { rocket_client });
                        continue;
                    }
                    Some(ident) if ident == "MemoryStore" => {
                        if has_store {
                            return Err(syn::Error::new(span, "Test cannot accept more than one `MemoryStore`"));
                        }
                        has_store = true;
                        args.push(quote! { store });
                        continue;
                    }
                    Some(ident) if ident == "Header" => {
                        if !has_user {
                            return Err(syn::Error::new(span, "An auth `Header` needs a role, e.g. `#[backend_test(voter)]`"));
                        }
                        if has_header {
                            return Err(syn::Error::new(span, "Test cannot accept more than one auth `Header`"));
                        }
                        has_header = true;
                        args.push(quote! { auth_header });
                        // Headers added to local requests must be `'static`.
                        pat_type.ty = parse_quote! { rocket::http::Header<'static> };
                        continue;
                    }
                    _ => {}
                }
            }
        }

        return Err(syn::Error::new(
            span,
            "Expected one of `client_ident: Client`, `store_ident: MemoryStore` or `auth_ident: Header`",
        ));
    }

    Ok(args)
}
