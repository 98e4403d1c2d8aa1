//! Composites on automatic storage, on the heap, and mixed.

use clap::Args;
use nestbox::{Composite, Slot};

use super::emit;

#[derive(Args, Debug)]
pub struct ClassicalArgs {}

pub fn execute(_args: ClassicalArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let runtime = global.create_runtime()?;

    // Automatic composite, automatic leaf injected by reference
    let mut a1 = runtime.leaf();
    a1.init_with_x(42);
    let mut b0 = runtime.composite();
    b0.init_with_leaf(&mut a1)?;
    b0.set_inline_x(17)?;

    // Heap composite owning a heap leaf
    let mut b1 = runtime.allocate_composite()?;
    b1.init();
    b1.set_inline_x(18)?;
    b1.set_referenced_x(42)?;
    let mut b1 = Slot::from(b1);

    // Automatic composite adopting a heap leaf
    let mut a2 = Slot::from(runtime.allocate_leaf()?);
    let mut b2 = runtime.composite();
    b2.adopt(&mut a2)?;
    b2.init();
    b2.set_inline_x(19)?;
    b2.set_referenced_x(42)?;

    emit(global, "classical", &b0.status_line("b0"))?;
    if let Some(b1) = b1.get() {
        emit(global, "classical", &b1.status_line("b1"))?;
    }
    emit(global, "classical", &b2.status_line("b2"))?;

    // b0 and a1 go out of scope, nothing to free
    Composite::release(&mut b1);
    b2.release_referenced()?;
    tracing::info!("Classical scenario released all heap storage");

    Ok(())
}
