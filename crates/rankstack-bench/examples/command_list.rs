//! Command-list recording backed by a rankstack arena.
//!
//! Each simulated frame records a variable number of draw commands into a
//! block, nests a short-lived scratch block for sort keys, then unwinds.
//! Prints the arena's counters after each frame.
//!
//! Run with: `cargo run -p rankstack-bench --example command_list`

use rankstack::{Arena, ArenaConfig, ArenaError, Block, Growth, UsageUnit};
use rankstack_bench::frame_sizes;

#[derive(Clone, Copy, Debug, Default)]
enum Command {
    #[default]
    Nop,
    BindPipeline(u32),
    Draw {
        vertex_count: u32,
        first_vertex: u32,
    },
}

fn record(commands: &Block<Command>, pipeline: u32) -> Result<(), ArenaError> {
    commands.with_slice_mut(|cmds| {
        if let Some((first, rest)) = cmds.split_first_mut() {
            *first = Command::BindPipeline(pipeline);
            for (i, cmd) in rest.iter_mut().enumerate() {
                *cmd = Command::Draw {
                    vertex_count: 3,
                    first_vertex: 3 * i as u32,
                };
            }
        }
    })
}

fn sort_keys(keys: &Block<u64>, commands: &Block<Command>) -> Result<(), ArenaError> {
    let cmds = commands.to_vec()?;
    keys.with_slice_mut(|keys| {
        for (key, cmd) in keys.iter_mut().zip(&cmds) {
            *key = match cmd {
                Command::Nop => u64::MAX,
                Command::BindPipeline(p) => u64::from(*p) << 32,
                Command::Draw {
                    vertex_count,
                    first_vertex,
                } => (u64::from(*first_vertex) << 8) | u64::from(*vertex_count),
            };
        }
        keys.sort_unstable();
    })
}

fn main() -> Result<(), ArenaError> {
    let config = ArenaConfig {
        growth: Growth::Elements(256),
        usage_unit: UsageUnit::Percent,
        ..ArenaConfig::default()
    };
    let commands_arena = Arena::<Command>::with_config(config.clone())?;
    let keys_arena = Arena::<u64>::with_config(config)?;

    // A long-lived block standing in for persistent per-pass state.
    let persistent = commands_arena.alloc_filled(4, Command::Nop)?;

    for (frame, count) in frame_sizes(8, 600, 2024).into_iter().enumerate() {
        let mut commands = commands_arena.alloc(count)?;
        record(&commands, frame as u32)?;

        let mut keys = keys_arena.alloc(count)?;
        sort_keys(&keys, &commands)?;
        keys.release()?;

        println!(
            "frame {frame}: {count:>3} commands, arena {:>5.1}% of {} ({})",
            commands_arena.usage(),
            commands_arena.capacity(),
            commands_arena.stats()
        );
        commands.release()?;
    }

    println!("persistent block: {persistent:?}");
    drop(persistent);
    println!("after teardown: {}", commands_arena.stats());
    Ok(())
}
