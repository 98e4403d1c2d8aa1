//! Allocate, init and configure through the component API, then release.

use clap::Args;
use nestbox::{Composite, Slot};

use super::emit;

#[derive(Args, Debug)]
pub struct ThreeStepArgs {}

pub fn execute(_args: ThreeStepArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let runtime = global.create_runtime()?;

    // Automatic storage: the injected leaf is initialized by its owner
    let mut a1 = runtime.leaf();
    a1.init();
    let mut b0 = runtime.composite();
    b0.init_with_leaf(&mut a1)?;
    b0.set_inline_x(17)?;
    b0.set_referenced_x(42)?;
    emit(global, "three-step", &b0.status_line("b0"))?;

    // Heap storage
    let mut b1 = Slot::from(runtime.allocate_composite()?);
    if let Some(composite) = b1.get_mut() {
        composite.init();
        composite.set_inline_x(18)?;
        composite.set_referenced_x(42)?;
        emit(global, "three-step", &composite.status_line("b1"))?;
    }
    Composite::release(&mut b1);

    Ok(())
}
