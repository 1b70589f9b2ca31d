//! Process many inputs in parallel

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use miette::{miette, Result};
use tracing::{error, info};

/// Run `job` on every input using one worker per available core.
///
/// A failing or panicking input is logged and does not stop the others.
/// Fails once all inputs are done if any of them failed.
pub fn run<F>(inputs: &[PathBuf], job: F) -> Result<()>
where
    F: Fn(&Path) -> Result<()> + Sync,
{
    let next = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    let workers = thread::available_parallelism()
        .map(|count| count.get())
        .unwrap_or(1)
        .min(inputs.len())
        .max(1);

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| loop {
                let index = next.fetch_add(1, Ordering::Relaxed);
                let Some(input) = inputs.get(index) else {
                    break;
                };

                info!("processing {}", input.display());
                match panic::catch_unwind(AssertUnwindSafe(|| job(input))) {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => {
                        error!("{}: {err:?}", input.display());
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(payload) => {
                        error!("{}: panicked: {}", input.display(), panic_message(&*payload));
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
    });

    match failed.into_inner() {
        0 => Ok(()),
        count => Err(miette!("{count} of {} inputs failed", inputs.len())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}
