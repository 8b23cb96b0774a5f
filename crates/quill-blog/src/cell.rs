use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use quill_crypto::AgentKey;
use quill_ledger::{Ledger, LedgerError, LinkEdge, LinkFilter, Missing, Revision, Tombstone};
use quill_store::{AppEntry, CodecError, EntryDocument};
use quill_types::{ActionId, AgentId, EntryRef};

use crate::entries::{Comment, LinkTypes, Post};
use crate::error::{BlogError, BlogResult};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdatePostInput {
    pub original_post_hash: ActionId,
    pub previous_post_hash: ActionId,
    pub updated_post: Post,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCommentInput {
    pub previous_comment_hash: ActionId,
    pub updated_comment: Comment,
}

/// One agent's view of the blog on one replica.
///
/// Writes are signed with the cell's agent key. Reads see whatever the
/// underlying ledger holds; another agent's writes appear only after the
/// replicas converge.
pub struct BlogCell {
    agent: AgentKey,
    ledger: Arc<Ledger>,
}

impl BlogCell {
    pub fn new(agent: AgentKey, ledger: Arc<Ledger>) -> Self {
        Self { agent, ledger }
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent.agent_id()
    }

    pub fn ledger(&self) -> &Arc<Ledger> {
        &self.ledger
    }

    // ---------------------------------------------------------------
    // Posts
    // ---------------------------------------------------------------

    pub fn create_post(&self, post: Post) -> BlogResult<ActionId> {
        post.validate()?;
        let id = self
            .ledger
            .create_chain(&EntryDocument::from_entry(&post), &self.agent)?;
        debug!(post = %id.short_hex(), "created post");
        Ok(id)
    }

    /// The post's first revision, or `None` if this replica has not seen it.
    pub fn get_original_post(&self, original_post_hash: &ActionId) -> BlogResult<Option<Revision>> {
        self.original_of::<Post>(original_post_hash)
    }

    pub fn get_latest_post(&self, post_hash: &ActionId) -> BlogResult<Revision> {
        typed::<Post>(self.ledger.get_latest(post_hash)?)
    }

    pub fn update_post(&self, input: UpdatePostInput) -> BlogResult<ActionId> {
        input.updated_post.validate()?;
        let original = typed::<Post>(self.ledger.get_original(&input.previous_post_hash)?)?;
        if original.action_id != input.original_post_hash {
            return Err(BlogError::Invalid {
                entry: Post::ENTRY_TYPE,
                reason: format!(
                    "{} is not a revision of {}",
                    input.previous_post_hash.short_hex(),
                    input.original_post_hash.short_hex()
                ),
            });
        }
        let id = self.ledger.update(
            &input.previous_post_hash,
            &EntryDocument::from_entry(&input.updated_post),
            &self.agent,
        )?;
        debug!(post = %original.action_id.short_hex(), revision = %id.short_hex(), "updated post");
        Ok(id)
    }

    pub fn get_all_revisions_for_post(
        &self,
        original_post_hash: &ActionId,
    ) -> BlogResult<Vec<Revision>> {
        self.revisions_of::<Post>(original_post_hash)
    }

    pub fn delete_post(&self, original_post_hash: &ActionId) -> BlogResult<ActionId> {
        self.revision_of::<Post>(original_post_hash)?;
        Ok(self.ledger.delete(original_post_hash, &self.agent)?)
    }

    pub fn get_oldest_delete_for_post(
        &self,
        original_post_hash: &ActionId,
    ) -> BlogResult<Tombstone> {
        self.revision_of::<Post>(original_post_hash)?;
        Ok(self.ledger.get_oldest_delete(original_post_hash)?)
    }

    pub fn get_all_deletes_for_post(
        &self,
        original_post_hash: &ActionId,
    ) -> BlogResult<Vec<Tombstone>> {
        self.revision_of::<Post>(original_post_hash)?;
        Ok(self.ledger.get_all_deletes(original_post_hash)?)
    }

    // ---------------------------------------------------------------
    // Comments
    // ---------------------------------------------------------------

    /// Create a comment and link it from its post. The post must already
    /// be present on this replica.
    pub fn create_comment(&self, comment: Comment) -> BlogResult<ActionId> {
        comment.validate()?;
        let posts = self.posts_for(&comment.post_ref);
        if posts.is_empty() {
            return Err(LedgerError::NotFound(missing(&comment.post_ref)).into());
        }
        let id = self
            .ledger
            .create_chain(&EntryDocument::from_entry(&comment), &self.agent)?;
        for post in posts {
            self.ledger.create_link(
                EntryRef::Action(post),
                id,
                LinkTypes::PostToComments.as_str(),
                "",
                &self.agent,
            )?;
        }
        debug!(comment = %id.short_hex(), post = %comment.post_ref, "created comment");
        Ok(id)
    }

    pub fn get_original_comment(
        &self,
        original_comment_hash: &ActionId,
    ) -> BlogResult<Option<Revision>> {
        self.original_of::<Comment>(original_comment_hash)
    }

    pub fn get_latest_comment(&self, comment_hash: &ActionId) -> BlogResult<Revision> {
        typed::<Comment>(self.ledger.get_latest(comment_hash)?)
    }

    pub fn update_comment(&self, input: UpdateCommentInput) -> BlogResult<ActionId> {
        input.updated_comment.validate()?;
        self.revision_of::<Comment>(&input.previous_comment_hash)?;
        let id = self.ledger.update(
            &input.previous_comment_hash,
            &EntryDocument::from_entry(&input.updated_comment),
            &self.agent,
        )?;
        debug!(
            previous = %input.previous_comment_hash.short_hex(),
            revision = %id.short_hex(),
            "updated comment"
        );
        Ok(id)
    }

    pub fn get_all_revisions_for_comment(
        &self,
        original_comment_hash: &ActionId,
    ) -> BlogResult<Vec<Revision>> {
        self.revisions_of::<Comment>(original_comment_hash)
    }

    /// Tombstone the comment and every live link to it from its post.
    pub fn delete_comment(&self, original_comment_hash: &ActionId) -> BlogResult<ActionId> {
        let original = typed::<Comment>(self.ledger.get_original(original_comment_hash)?)?;
        let comment: Comment = original.entry_as()?;
        let delete = self.ledger.delete(original_comment_hash, &self.agent)?;

        let filter = LinkFilter::of_type(LinkTypes::PostToComments.as_str());
        for post in self.posts_for(&comment.post_ref) {
            for edge in self.ledger.get_live_links(&EntryRef::Action(post), &filter) {
                if edge.target == original.action_id {
                    self.ledger.delete_link(&edge.action_id, &self.agent)?;
                }
            }
        }
        debug!(
            comment = %original.action_id.short_hex(),
            delete = %delete.short_hex(),
            "deleted comment"
        );
        Ok(delete)
    }

    pub fn get_oldest_delete_for_comment(
        &self,
        original_comment_hash: &ActionId,
    ) -> BlogResult<Tombstone> {
        self.revision_of::<Comment>(original_comment_hash)?;
        Ok(self.ledger.get_oldest_delete(original_comment_hash)?)
    }

    pub fn get_all_deletes_for_comment(
        &self,
        original_comment_hash: &ActionId,
    ) -> BlogResult<Vec<Tombstone>> {
        self.revision_of::<Comment>(original_comment_hash)?;
        Ok(self.ledger.get_all_deletes(original_comment_hash)?)
    }

    /// Live links from the post to its comments. Empty if the post is not
    /// present on this replica yet.
    pub fn get_comments_for_post(&self, post_ref: &EntryRef) -> BlogResult<Vec<LinkEdge>> {
        let filter = LinkFilter::of_type(LinkTypes::PostToComments.as_str());
        Ok(self
            .posts_for(post_ref)
            .into_iter()
            .flat_map(|post| self.ledger.get_live_links(&EntryRef::Action(post), &filter))
            .collect())
    }

    /// Links from the post to comments that were deleted, each with its
    /// tombstones.
    pub fn get_deleted_comments_for_post(
        &self,
        post_ref: &EntryRef,
    ) -> BlogResult<Vec<(LinkEdge, Vec<Tombstone>)>> {
        let filter = LinkFilter::of_type(LinkTypes::PostToComments.as_str());
        Ok(self
            .posts_for(post_ref)
            .into_iter()
            .flat_map(|post| self.ledger.get_links_with_deletes(&EntryRef::Action(post), &filter))
            .filter(|(_, deletes)| !deletes.is_empty())
            .collect())
    }

    // ---------------------------------------------------------------
    // Helpers
    // ---------------------------------------------------------------

    /// Originals of the post chains a reference denotes.
    fn posts_for(&self, post_ref: &EntryRef) -> Vec<ActionId> {
        self.ledger
            .resolve(post_ref)
            .into_iter()
            .filter(|id| self.revision_of::<Post>(id).is_ok())
            .collect()
    }

    fn revision_of<E: AppEntry>(&self, id: &ActionId) -> BlogResult<Revision> {
        typed::<E>(self.ledger.get_revision(id)?)
    }

    fn original_of<E: AppEntry>(&self, id: &ActionId) -> BlogResult<Option<Revision>> {
        match self.ledger.get_original(id) {
            Ok(revision) => typed::<E>(revision).map(Some),
            Err(LedgerError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    fn revisions_of<E: AppEntry>(&self, id: &ActionId) -> BlogResult<Vec<Revision>> {
        self.ledger
            .get_all_revisions(id)?
            .into_iter()
            .map(typed::<E>)
            .collect()
    }
}

fn typed<E: AppEntry>(revision: Revision) -> BlogResult<Revision> {
    if revision.entry.entry_type != E::ENTRY_TYPE {
        return Err(CodecError::WrongEntryType {
            expected: E::ENTRY_TYPE.to_string(),
            found: revision.entry.entry_type,
        }
        .into());
    }
    Ok(revision)
}

fn missing(reference: &EntryRef) -> Missing {
    match reference {
        EntryRef::Action(id) => Missing::Action(*id),
        EntryRef::Content(hash) => Missing::Content(*hash),
    }
}

impl std::fmt::Debug for BlogCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlogCell")
            .field("agent", &self.agent_id().short_id())
            .field("ledger", &self.ledger)
            .finish()
    }
}
