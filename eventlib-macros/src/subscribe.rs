//! Subscribe-related macros.
//!
//! This module contains:
//! - `#[subscribe]` on a function - keeps the function as written, generates
//!   a `<CamelCaseName>Handler` unit type calling it, and registers that on
//!   the default event system
//! - `#[subscribe]` on a `Handler`, `AsyncHandler`, `Scope` or `AsyncScope`
//!   impl block - registers `Self::default()` on the default event system

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::{
    Expr, FnArg, GenericArgument, Ident, Item, ItemFn, ItemImpl, LitBool, PathArguments, Token,
    Type,
    parse::{Parse, ParseStream},
    parse_macro_input,
};

/// Arguments for the `#[subscribe]` macro.
pub(crate) struct SubscribeArgs {
    /// Optional explicit event type.
    pub event_type: Option<Type>,
    /// Priority expression (lower = earlier / outer).
    pub priority: Option<Expr>,
    /// Whether failures abort the dispatch.
    pub critical: bool,
}

impl Parse for SubscribeArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut event_type = None;
        let mut priority = None;
        let mut critical = false;

        // A leading type, unless it is one of the named arguments.
        if !input.is_empty() && !starts_named_arg(input) {
            event_type = Some(input.parse()?);
        }

        while !input.is_empty() {
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
            if input.is_empty() {
                break;
            }

            let ident: Ident = input.parse()?;
            match ident.to_string().as_str() {
                "priority" => {
                    input.parse::<Token![=]>()?;
                    priority = Some(input.parse()?);
                }
                "critical" => {
                    critical = if input.peek(Token![=]) {
                        input.parse::<Token![=]>()?;
                        input.parse::<LitBool>()?.value
                    } else {
                        true
                    };
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }
        }

        Ok(SubscribeArgs {
            event_type,
            priority,
            critical,
        })
    }
}

fn starts_named_arg(input: ParseStream) -> bool {
    let fork = input.fork();
    let Ok(ident) = fork.parse::<Ident>() else {
        return false;
    };
    matches!(ident.to_string().as_str(), "priority" | "critical")
        && (fork.is_empty() || fork.peek(Token![=]) || fork.peek(Token![,]))
}

/// Subscribe a function or a handler type on the default event system.
///
/// # Usage
///
/// ```rust,ignore
/// // Event type inferred from the single parameter. `on_chat` stays
/// // callable; the registered handler is the generated `OnChatHandler`.
/// #[subscribe]
/// fn on_chat(event: &mut ChatEvent) { ... }
///
/// // Priority and criticality
/// #[subscribe(priority = 100, critical)]
/// fn print_chat(event: &mut ChatEvent) -> Result<(), ChatError> { ... }
///
/// // Registered on a subtype, called with the projection onto `Left`
/// #[subscribe(Merged)]
/// fn on_left_of_merged(event: &mut Left) { ... }
///
/// // A scope type; registered as `ChatErrors::default()`
/// #[subscribe(priority = -100)]
/// impl Scope<ChatEvent> for ChatErrors { ... }
/// ```
pub fn subscribe_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as SubscribeArgs);
    let item = parse_macro_input!(item as Item);

    let expanded = match item {
        Item::Fn(function) => expand_fn(&args, function),
        Item::Impl(block) => expand_impl(&args, block),
        other => Err(syn::Error::new_spanned(
            other,
            "`#[subscribe]` applies to functions and handler impl blocks",
        )),
    };

    match expanded {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_fn(args: &SubscribeArgs, function: ItemFn) -> syn::Result<TokenStream2> {
    let fn_name = &function.sig.ident;
    let fn_vis = &function.vis;
    let is_async = function.sig.asyncness.is_some();

    let (param_type, mutable) = event_param(&function)?;
    let event_type = args.event_type.as_ref().unwrap_or(param_type);
    let same_type = quote!(#event_type).to_string() == quote!(#param_type).to_string();

    let view = if same_type {
        quote! { __event }
    } else {
        quote! { <#event_type as ::eventlib::Extends<#param_type>>::upcast_mut(__event) }
    };
    let argument = if mutable {
        view
    } else {
        quote! { &*#view }
    };

    let handler = handler_ident(fn_name);
    let handler_impl = if is_async {
        quote! {
            impl ::eventlib::AsyncHandler<#event_type> for #handler {
                async fn handle(
                    &self,
                    __event: &mut #event_type,
                ) -> ::core::result::Result<(), ::eventlib::BoxError> {
                    ::eventlib::IntoOutcome::into_outcome(#fn_name(#argument).await)
                }
            }
        }
    } else {
        quote! {
            impl ::eventlib::Handler<#event_type> for #handler {
                fn handle(
                    &self,
                    __event: &mut #event_type,
                ) -> ::core::result::Result<(), ::eventlib::BoxError> {
                    ::eventlib::IntoOutcome::into_outcome(#fn_name(#argument))
                }
            }
        }
    };

    let terminal = if is_async {
        quote! { handler_async }
    } else {
        quote! { handler }
    };
    let registration = registration(
        args,
        event_type,
        &quote!(#fn_name),
        &terminal,
        &quote!(#handler),
    );

    Ok(quote! {
        #function

        #[derive(Clone, Copy, Debug, Default)]
        #[doc = concat!("Handler generated by `#[subscribe]` on [`", stringify!(#fn_name), "`].")]
        #fn_vis struct #handler;

        #handler_impl

        #registration
    })
}

/// `on_chat` -> `OnChatHandler`.
fn handler_ident(function: &Ident) -> Ident {
    let name = function.to_string();
    let camel: String = name
        .trim_start_matches("r#")
        .split('_')
        .flat_map(|word| {
            let mut chars = word.chars();
            chars
                .next()
                .into_iter()
                .flat_map(char::to_uppercase)
                .chain(chars)
        })
        .collect();
    format_ident!("{}Handler", camel, span = function.span())
}

/// The type of the single event parameter, and whether it is `&mut`.
fn event_param(function: &ItemFn) -> syn::Result<(&Type, bool)> {
    let inputs = &function.sig.inputs;
    let mut typed = inputs.iter();
    let param = match (typed.next(), typed.next()) {
        (Some(FnArg::Typed(param)), None) => param,
        (Some(FnArg::Receiver(receiver)), _) => {
            return Err(syn::Error::new_spanned(
                receiver,
                "subscribed functions cannot take `self`",
            ));
        }
        (None, _) => {
            return Err(syn::Error::new_spanned(
                &function.sig,
                "cannot infer the event type: the function takes no parameter",
            ));
        }
        (Some(_), Some(_)) => {
            return Err(syn::Error::new_spanned(
                inputs,
                "cannot infer the event type: expected exactly one parameter, `event: &mut E`",
            ));
        }
    };

    match &*param.ty {
        Type::Reference(reference) => Ok((&reference.elem, reference.mutability.is_some())),
        other => Err(syn::Error::new_spanned(
            other,
            "the event parameter must be a reference, `&mut E` or `&E`",
        )),
    }
}

fn expand_impl(args: &SubscribeArgs, block: ItemImpl) -> syn::Result<TokenStream2> {
    if let Some(explicit) = &args.event_type {
        return Err(syn::Error::new_spanned(
            explicit,
            "the event type of an impl block is taken from its trait",
        ));
    }

    let Some((_, trait_path, _)) = &block.trait_ else {
        return Err(syn::Error::new_spanned(
            &block.self_ty,
            "`#[subscribe]` needs a `Handler`, `AsyncHandler`, `Scope` or `AsyncScope` impl",
        ));
    };
    let Some(segment) = trait_path.segments.last() else {
        return Err(syn::Error::new_spanned(trait_path, "expected a trait path"));
    };

    let terminal = match segment.ident.to_string().as_str() {
        "Handler" => quote! { handler },
        "AsyncHandler" => quote! { handler_async },
        "Scope" => quote! { scope },
        "AsyncScope" => quote! { scope_async },
        _ => {
            return Err(syn::Error::new_spanned(
                &segment.ident,
                "`#[subscribe]` needs a `Handler`, `AsyncHandler`, `Scope` or `AsyncScope` impl",
            ));
        }
    };

    let event_type = match &segment.arguments {
        PathArguments::AngleBracketed(generic) if generic.args.len() == 1 => {
            match generic.args.first() {
                Some(GenericArgument::Type(ty)) => ty.clone(),
                _ => {
                    return Err(syn::Error::new_spanned(
                        generic,
                        "cannot infer the event type from this trait",
                    ));
                }
            }
        }
        other => {
            return Err(syn::Error::new_spanned(
                other,
                "cannot infer the event type: expected exactly one type argument",
            ));
        }
    };

    let self_ty = &block.self_ty;
    let registration = registration(
        args,
        &event_type,
        &quote!(#self_ty),
        &terminal,
        &quote!(<#self_ty as ::core::default::Default>::default()),
    );

    Ok(quote! {
        #block

        #registration
    })
}

/// A registration of `value` through `Subscriber::<terminal>`, submitted to
/// the default system's inventory.
fn registration(
    args: &SubscribeArgs,
    event_type: &Type,
    name: &TokenStream2,
    terminal: &TokenStream2,
    value: &TokenStream2,
) -> TokenStream2 {
    let priority = args.priority.as_ref().map(|priority| quote! { .priority(#priority) });
    let critical = args.critical.then(|| quote! { .critical() });

    quote! {
        const _: () = {
            fn __register(
                system: &::eventlib::EventSystem,
            ) -> ::core::result::Result<(), ::eventlib::RegistrationError> {
                system
                    .subscribe::<#event_type>()
                    .name(stringify!(#name))
                    #priority
                    #critical
                    .#terminal(#value)
                    .map(::core::mem::drop)
            }

            ::eventlib::inventory::submit! {
                ::eventlib::Registration::new(stringify!(#name), file!(), line!(), __register)
            }
        };
    }
}

