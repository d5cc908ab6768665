//! Catalog fixture validation.

use std::path::Path;

use order_desk_api::services::Catalog;

use super::CommandError;

/// Load the catalog at `path`, failing on any inconsistency.
#[allow(clippy::print_stdout)]
pub fn check(path: &Path) -> Result<(), CommandError> {
    let catalog = Catalog::load(path)?;
    println!(
        "{}: {} shops, {} products",
        path.display(),
        catalog.shop_count(),
        catalog.product_count()
    );
    Ok(())
}
