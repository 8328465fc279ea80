use std::process;

// This function should not be expanded. Please add any logic to
// `turbo_ignore_lib::main` instead.
fn main() {
    process::exit(turbo_ignore_lib::main())
}
