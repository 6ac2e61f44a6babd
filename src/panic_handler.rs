use std::panic;

/// Installs the process panic hook.
///
/// Debug builds get `better-panic` backtraces; release builds write a
/// `human-panic` crash report instead. The panic is logged before either
/// hook runs.
pub fn initialize_panic_handler() {
    #[cfg(debug_assertions)]
    better_panic::install();

    #[cfg(not(debug_assertions))]
    human_panic::setup_panic!();

    let default_hook = panic::take_hook();
    panic::set_hook(Box::new(move |panic_info| {
        log::error!("etymon panicked: {panic_info}");
        log::logger().flush();

        default_hook(panic_info);

        std::process::exit(1);
    }));
}
