use proc_macro::TokenStream;
use quote::quote;
use syn::{Block, ItemFn, LitStr, ReturnType, parse_macro_input};

pub fn timer_inner(attr: TokenStream, item: TokenStream) -> TokenStream {
    let label = if attr.is_empty() {
        None
    } else {
        Some(parse_macro_input!(attr as LitStr).value())
    };
    let mut func = parse_macro_input!(item as ItemFn);

    if func.sig.asyncness.is_some() {
        return syn::Error::new_spanned(&func.sig, "timer does not support async functions")
            .to_compile_error()
            .into();
    }

    let label = label.unwrap_or_else(|| func.sig.ident.to_string());
    let output = match &func.sig.output {
        ReturnType::Default => quote! { () },
        ReturnType::Type(_, ty) => quote! { #ty },
    };
    let block = &func.block;

    let wrapped = quote! {
        {
            let __timer_start = std::time::Instant::now();
            let __timer_result = (move || -> #output #block)();
            log::debug!(
                "{}: elapsed={:.3}ms",
                #label,
                __timer_start.elapsed().as_secs_f64() * 1_000.0
            );
            __timer_result
        }
    };

    match syn::parse2::<Block>(wrapped) {
        Ok(block) => {
            func.block = Box::new(block);
            TokenStream::from(quote! { #func })
        }
        Err(err) => err.to_compile_error().into(),
    }
}
