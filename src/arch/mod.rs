cfg_if::cfg_if! {
    if #[cfg(all(target_arch = "arm", target_feature = "thumb2"))] {
        mod cortex_m;
        pub use cortex_m::in_isr;
    } else {
        mod fallback;
        pub use fallback::in_isr;
    }
}
