//! GraphQL schema export.

/// Print the schema in SDL form.
#[allow(clippy::print_stdout)]
pub fn print() {
    println!("{}", order_desk_api::graphql::sdl());
}
