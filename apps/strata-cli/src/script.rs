//! Line-oriented edit scripts.
//!
//! One command per line; blank lines and `#` comments are skipped.
//! Entities are referred to by the order they were spawned in the script.

use anyhow::Context;
use glam::Vec3;
use std::io::Write;
use strata_common::{Block, BlockPos, ChunkKey, Dimension, EntityId, SelectionBox, Transform};
use strata_history::ManagerScope;
use strata_level::Level;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub enum ScriptCommand {
    Block {
        dimension: Dimension,
        pos: BlockPos,
        block: Block,
    },
    Fill {
        dimension: Dimension,
        area: SelectionBox,
        block: Block,
    },
    DeleteChunk(ChunkKey),
    Spawn {
        dimension: Dimension,
        kind: String,
        position: Vec3,
    },
    Move {
        entity: usize,
        position: Vec3,
    },
    Despawn {
        entity: usize,
    },
    Rename(String),
    SpawnPoint(BlockPos),
    Select(Option<SelectionBox>),
    Commit(ManagerScope),
    Undo,
    Redo,
    Save,
    Restore,
    Status,
}

#[derive(Debug, thiserror::Error)]
#[error("line {line}: {message}")]
pub struct ScriptError {
    pub line: usize,
    pub message: String,
}

/// Parse a whole script. Returned commands carry their 1-based line number.
pub fn parse_script(source: &str) -> Result<Vec<(usize, ScriptCommand)>, ScriptError> {
    let mut commands = Vec::new();
    for (index, raw) in source.lines().enumerate() {
        let line = index + 1;
        let text = raw.split('#').next().unwrap_or_default().trim();
        if text.is_empty() {
            continue;
        }
        let command = parse_line(text).map_err(|message| ScriptError { line, message })?;
        commands.push((line, command));
    }
    Ok(commands)
}

fn parse_line(text: &str) -> Result<ScriptCommand, String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let (name, args) = words.split_first().ok_or("empty command")?;
    let command = match *name {
        "block" => {
            expect_args(name, args, 5)?;
            ScriptCommand::Block {
                dimension: dimension(args[0])?,
                pos: block_pos(&args[1..4])?,
                block: Block::new(args[4]),
            }
        }
        "fill" => {
            expect_args(name, args, 8)?;
            ScriptCommand::Fill {
                dimension: dimension(args[0])?,
                area: SelectionBox::new(block_pos(&args[1..4])?, block_pos(&args[4..7])?),
                block: Block::new(args[7]),
            }
        }
        "delete-chunk" => {
            expect_args(name, args, 3)?;
            ScriptCommand::DeleteChunk(ChunkKey::new(
                dimension(args[0])?,
                number(args[1])?,
                number(args[2])?,
            ))
        }
        "spawn" => {
            expect_args(name, args, 5)?;
            ScriptCommand::Spawn {
                dimension: dimension(args[0])?,
                kind: args[1].to_owned(),
                position: vec3(&args[2..5])?,
            }
        }
        "move" => {
            expect_args(name, args, 4)?;
            ScriptCommand::Move {
                entity: number(args[0])?,
                position: vec3(&args[1..4])?,
            }
        }
        "despawn" => {
            expect_args(name, args, 1)?;
            ScriptCommand::Despawn {
                entity: number(args[0])?,
            }
        }
        "rename" => {
            if args.is_empty() {
                return Err("rename needs a name".into());
            }
            ScriptCommand::Rename(args.join(" "))
        }
        "spawn-point" => {
            expect_args(name, args, 3)?;
            ScriptCommand::SpawnPoint(block_pos(args)?)
        }
        "select" => match args {
            ["none"] => ScriptCommand::Select(None),
            _ => {
                expect_args(name, args, 6)?;
                ScriptCommand::Select(Some(SelectionBox::new(
                    block_pos(&args[0..3])?,
                    block_pos(&args[3..6])?,
                )))
            }
        },
        "commit" => match args {
            [] | ["all"] => ScriptCommand::Commit(ManagerScope::All),
            ["world"] => ScriptCommand::Commit(ManagerScope::World),
            ["non-world"] => ScriptCommand::Commit(ManagerScope::NonWorld),
            _ => return Err(format!("unknown commit scope {:?}", args.join(" "))),
        },
        "undo" => ScriptCommand::Undo,
        "redo" => ScriptCommand::Redo,
        "save" => ScriptCommand::Save,
        "restore" => ScriptCommand::Restore,
        "status" => ScriptCommand::Status,
        other => return Err(format!("unknown command {other:?}")),
    };
    Ok(command)
}

fn expect_args(name: &str, args: &[&str], count: usize) -> Result<(), String> {
    if args.len() != count {
        return Err(format!("{name} takes {count} arguments, got {}", args.len()));
    }
    Ok(())
}

fn dimension(word: &str) -> Result<Dimension, String> {
    word.parse().map_err(|e: strata_common::ParseDimensionError| e.to_string())
}

fn number<T: std::str::FromStr>(word: &str) -> Result<T, String> {
    word.parse()
        .map_err(|_| format!("expected a number, got {word:?}"))
}

fn block_pos(words: &[&str]) -> Result<BlockPos, String> {
    Ok(BlockPos::new(
        number(words[0])?,
        number(words[1])?,
        number(words[2])?,
    ))
}

fn vec3(words: &[&str]) -> Result<Vec3, String> {
    Ok(Vec3::new(
        number(words[0])?,
        number(words[1])?,
        number(words[2])?,
    ))
}

/// Runs script commands against a level.
pub struct Session {
    level: Level,
    spawned: Vec<EntityId>,
}

impl Session {
    pub fn new(level: Level) -> Self {
        Self {
            level,
            spawned: Vec::new(),
        }
    }

    pub fn level(&self) -> &Level {
        &self.level
    }

    pub fn run(
        &mut self,
        commands: &[(usize, ScriptCommand)],
        out: &mut impl Write,
    ) -> anyhow::Result<()> {
        for (line, command) in commands {
            debug!(line, ?command, "executing");
            self.execute(command, out)
                .with_context(|| format!("line {line}"))?;
        }
        Ok(())
    }

    pub fn execute(&mut self, command: &ScriptCommand, out: &mut impl Write) -> anyhow::Result<()> {
        let level = &mut self.level;
        match command {
            ScriptCommand::Block {
                dimension,
                pos,
                block,
            } => level.set_block(*dimension, *pos, block.clone())?,
            ScriptCommand::Fill {
                dimension,
                area,
                block,
            } => {
                let written = level.fill(*dimension, *area, block.clone())?;
                writeln!(out, "filled {written} blocks with {block}")?;
            }
            ScriptCommand::DeleteChunk(key) => level.delete_chunk(*key)?,
            ScriptCommand::Spawn {
                dimension,
                kind,
                position,
            } => {
                let id = level.spawn(*dimension, kind.as_str(), Transform::at(*position));
                writeln!(out, "spawned #{} {kind} as {id}", self.spawned.len())?;
                self.spawned.push(id);
            }
            ScriptCommand::Move { entity, position } => {
                let id = self.entity(*entity)?;
                self.level.set_transform(id, Transform::at(*position))?;
            }
            ScriptCommand::Despawn { entity } => {
                let id = self.entity(*entity)?;
                self.level.despawn(id)?;
            }
            ScriptCommand::Rename(name) => level.rename(name.as_str()),
            ScriptCommand::SpawnPoint(pos) => level.set_spawn(*pos),
            ScriptCommand::Select(selection) => level.select(*selection),
            ScriptCommand::Commit(scope) => {
                let created = level.create_undo_point(*scope)?;
                writeln!(
                    out,
                    "commit {scope:?}: {}",
                    if created { "created" } else { "nothing to commit" }
                )?;
            }
            ScriptCommand::Undo => level.undo()?,
            ScriptCommand::Redo => level.redo()?,
            ScriptCommand::Save => {
                let chunks = level.unsaved_chunks();
                level.mark_saved()?;
                writeln!(out, "saved ({} chunks written)", chunks.len())?;
            }
            ScriptCommand::Restore => level.restore_last_undo_point()?,
            ScriptCommand::Status => writeln!(out, "{}", level.summary())?,
        }
        Ok(())
    }

    fn entity(&self, index: usize) -> anyhow::Result<EntityId> {
        self.spawned
            .get(index)
            .copied()
            .with_context(|| format!("no entity #{index} was spawned"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_level::LevelMetadata;

    fn run(source: &str) -> (Session, String) {
        let commands = parse_script(source).unwrap();
        let mut session = Session::new(Level::new(LevelMetadata::default()).unwrap());
        let mut out = Vec::new();
        session.run(&commands, &mut out).unwrap();
        (session, String::from_utf8(out).unwrap())
    }

    #[test]
    fn parses_commands_and_skips_comments() {
        let commands = parse_script(
            "# setup\n\nblock overworld 1 64 -2 stone\ncommit non-world # metadata only\nundo\n",
        )
        .unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(
            commands[0],
            (
                3,
                ScriptCommand::Block {
                    dimension: Dimension::Overworld,
                    pos: BlockPos::new(1, 64, -2),
                    block: Block::new("stone"),
                }
            )
        );
        assert_eq!(commands[1].1, ScriptCommand::Commit(ManagerScope::NonWorld));
    }

    #[test]
    fn commit_defaults_to_all() {
        let commands = parse_script("commit").unwrap();
        assert_eq!(commands[0].1, ScriptCommand::Commit(ManagerScope::All));
    }

    #[test]
    fn parse_errors_carry_line_numbers() {
        let err = parse_script("undo\nblock overworld 1 2\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.to_string().starts_with("line 2:"));

        let err = parse_script("commit sideways").unwrap_err();
        assert!(err.message.contains("sideways"));

        assert!(parse_script("block mars 0 0 0 stone").is_err());
        assert!(parse_script("teleport").is_err());
    }

    #[test]
    fn scoped_commit_then_undo() {
        let (session, out) = run(
            "block overworld 0 0 0 stone\n\
             rename Scripted\n\
             commit non-world\n\
             undo\n",
        );
        assert!(out.contains("commit NonWorld: created"));
        let level = session.level();
        assert_eq!(level.metadata().name, "Untitled");
        assert!(level.block(Dimension::Overworld, BlockPos::new(0, 0, 0)).is_some());
    }

    #[test]
    fn empty_commit_is_reported() {
        let (_, out) = run("commit\n");
        assert!(out.contains("nothing to commit"));
    }

    #[test]
    fn entities_are_addressed_by_spawn_order() {
        let (session, out) = run(
            "spawn overworld minecraft:pig 0 64 0\n\
             spawn overworld minecraft:cow 5 64 5\n\
             commit\n\
             despawn 0\n\
             move 1 6 64 6\n\
             commit\n\
             status\n",
        );
        assert!(out.contains("spawned #1 minecraft:cow"));
        assert_eq!(session.level().entity_count(), 1);
        assert!(out.contains("entities=1"));
    }

    #[test]
    fn unknown_entity_index_fails_with_line() {
        let commands = parse_script("move 3 0 0 0").unwrap();
        let mut session = Session::new(Level::new(LevelMetadata::default()).unwrap());
        let err = session.run(&commands, &mut Vec::<u8>::new()).unwrap_err();
        assert_eq!(err.to_string(), "line 1");
        assert!(format!("{err:#}").contains("no entity #3"));
    }

    #[test]
    fn save_reports_written_chunks() {
        let (session, out) = run(
            "fill overworld 0 0 0 32 1 1 stone\n\
             commit world\n\
             save\n",
        );
        assert!(out.contains("filled 32 blocks"));
        assert!(out.contains("saved (2 chunks written)"));
        assert!(!session.level().changed());
    }
}
