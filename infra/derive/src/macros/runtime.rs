use proc_macro2::TokenStream;
use quote::quote;
use syn::{Error, ItemFn, ReturnType, Type};

/// Expands the `#[mshield_runtime::main]` attribute macro.
#[must_use]
pub fn expand_main(args: TokenStream, input: ItemFn) -> TokenStream {
    if input.sig.asyncness.is_none() {
        return Error::new_spanned(
            &input.sig.ident,
            "The #[mshield_runtime::main] attribute can only be used on async functions",
        )
        .to_compile_error();
    }

    if !returns_result(&input.sig.output) {
        return Error::new_spanned(
            &input.sig.output,
            "The #[mshield_runtime::main] attribute requires a Result return type",
        )
        .to_compile_error();
    }

    let name = &input.sig.ident;
    let body = &input.block;
    let vis = &input.vis;
    let attrs = &input.attrs;
    let output = &input.sig.output;

    let runtime_call = match parse_profile(args) {
        Ok(profile) => profile,
        Err(err) => return err,
    };

    quote! {
        #(#attrs)*
        #vis fn #name() #output {
            let config = #runtime_call;
            let rt = ::mshield_runtime::build_runtime_with_config(&config)?;
            rt.block_on(async { #body })
        }
    }
}

fn parse_profile(args: TokenStream) -> Result<TokenStream, TokenStream> {
    if args.is_empty() {
        return Ok(quote! { ::mshield_runtime::RuntimeConfig::default() });
    }

    if let Ok(assign) = syn::parse2::<syn::MetaNameValue>(args.clone()) {
        if !assign.path.is_ident("worker_threads") {
            return Err(Error::new_spanned(assign.path, "Expected `worker_threads = N`")
                .to_compile_error());
        }
        let syn::Expr::Lit(syn::ExprLit { lit: syn::Lit::Int(count), .. }) = &assign.value else {
            return Err(Error::new_spanned(assign.value, "worker_threads must be an integer literal")
                .to_compile_error());
        };
        let count: usize = count.base10_parse().map_err(|err| err.to_compile_error())?;
        if count == 0 {
            return Err(Error::new_spanned(&assign.value, "worker_threads must be at least 1")
                .to_compile_error());
        }
        return Ok(quote! {
            ::mshield_runtime::RuntimeConfig { worker_threads: #count, ..::mshield_runtime::RuntimeConfig::default() }
        });
    }

    let ident: syn::Ident = syn::parse2(args).map_err(|err| err.to_compile_error())?;
    match ident.to_string().as_str() {
        "high_performance" => Ok(quote! { ::mshield_runtime::RuntimeConfig::high_performance() }),
        "memory_efficient" => Ok(quote! { ::mshield_runtime::RuntimeConfig::memory_efficient() }),
        "default" => Ok(quote! { ::mshield_runtime::RuntimeConfig::default() }),
        _ => Err(Error::new_spanned(
            ident,
            "Unknown runtime profile. Use: high_performance, memory_efficient, default or worker_threads = N",
        )
        .to_compile_error()),
    }
}

fn returns_result(output: &ReturnType) -> bool {
    let ReturnType::Type(_, ty) = output else {
        return false;
    };
    let Type::Path(path) = &**ty else {
        return false;
    };
    path.path.segments.last().is_some_and(|seg| seg.ident == "Result")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_args_select_default_profile() {
        let tokens = parse_profile(TokenStream::new()).map(|t| t.to_string());
        assert!(tokens.is_ok_and(|t| t.contains("RuntimeConfig :: default")));
    }

    #[test]
    fn worker_threads_override() {
        let tokens = parse_profile(quote!(worker_threads = 3)).map(|t| t.to_string());
        assert!(tokens.is_ok_and(|t| t.contains("worker_threads : 3usize")));
    }

    #[test]
    fn unknown_profile_is_rejected() {
        assert!(parse_profile(quote!(turbo)).is_err());
        assert!(parse_profile(quote!(worker_threads = 0)).is_err());
    }

    #[test]
    fn sync_main_is_rejected() {
        let item: ItemFn = syn::parse_quote! { fn main() -> Result<(), ()> { Ok(()) } };
        assert!(expand_main(TokenStream::new(), item).to_string().contains("compile_error"));
    }
}
