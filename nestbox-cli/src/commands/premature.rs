//! Configuration issued before init.
//!
//! Under the permissive policy the early setters are discarded and the
//! first line shows zero state. Under `--strict` the first setter fails.

use clap::Args;
use nestbox::{Composite, Slot};

use super::emit;

#[derive(Args, Debug)]
pub struct PrematureArgs {
    /// Value written to the inline leaf
    #[arg(long, default_value_t = 17, allow_negative_numbers = true)]
    pub inline_x: i32,

    /// Value written to the referenced leaf
    #[arg(long, default_value_t = 42, allow_negative_numbers = true)]
    pub referenced_x: i32,
}

pub fn execute(args: PrematureArgs, global: &crate::cli::GlobalFlags) -> anyhow::Result<()> {
    let runtime = global.create_runtime()?;
    let mut slot = Slot::from(runtime.allocate_composite()?);

    let result = configure_then_init(&mut slot, &args, global);
    Composite::release(&mut slot);
    result
}

fn configure_then_init(
    slot: &mut Slot<Composite<'_>>,
    args: &PrematureArgs,
    global: &crate::cli::GlobalFlags,
) -> anyhow::Result<()> {
    let Some(b) = slot.get_mut() else {
        return Ok(());
    };

    b.set_inline_x(args.inline_x)?;
    b.set_referenced_x(args.referenced_x)?;
    emit(global, "premature", &b.status_line("before-init"))?;

    b.init();
    b.set_inline_x(args.inline_x)?;
    b.set_referenced_x(args.referenced_x)?;
    emit(global, "premature", &b.status_line("after-init"))?;

    Ok(())
}
