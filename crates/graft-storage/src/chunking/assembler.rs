//! CommitAssembler: regroups an ordered payload stream into commits.

use graft_core::Commit;

use super::CommitPayload;

/// Folds consecutive payloads of one commit back into that commit.
///
/// A payload with `part == 0`, or one whose id differs from the commit being
/// built, starts a new commit.
#[derive(Debug, Default)]
pub struct CommitAssembler {
    current: Option<Commit>,
    finished: Vec<Commit>,
}

impl CommitAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, payload: CommitPayload) {
        match &mut self.current {
            Some(commit) if payload.part > 0 && *commit.id() == payload.commit_id => {
                commit.append_added(payload.added);
                commit.append_removed(payload.removed);
            }
            _ => {
                if let Some(done) = self.current.take() {
                    self.finished.push(done);
                }
                self.current = Some(payload.into_commit());
            }
        }
    }

    pub fn finish(mut self) -> Vec<Commit> {
        if let Some(done) = self.current.take() {
            self.finished.push(done);
        }
        self.finished
    }

    pub fn assemble(payloads: impl IntoIterator<Item = CommitPayload>) -> Vec<Commit> {
        let mut assembler = Self::new();
        for payload in payloads {
            assembler.push(payload);
        }
        assembler.finish()
    }
}
