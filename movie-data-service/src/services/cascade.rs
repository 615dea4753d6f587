//! Cascade planning for denormalized references.
//!
//! Movies, tags, actors, ratings and reviews refer to each other by title or
//! name. Every logical operation that touches one of those values is turned
//! into a [`CascadePlan`]: an ordered list of single-collection writes that
//! together leave every reference consistent. Planning is pure; execution
//! lives in [`MovieDb::apply`](super::MovieDb::apply).

use mongodb::bson::{doc, oid::ObjectId, Document};
use serde::Serialize;

use super::database::collections::{
    ACTORS, MOVIES, RATINGS, REVIEWS, TAGS, USER_ASSOCIATED_RATINGS,
};
use crate::models::Movie;

/// A single write against one collection.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    InsertOne {
        document: Document,
    },
    UpdateOne {
        filter: Document,
        update: Document,
        upsert: bool,
    },
    UpdateMany {
        filter: Document,
        update: Document,
    },
    DeleteOne {
        filter: Document,
    },
    DeleteMany {
        filter: Document,
    },
}

impl WriteOp {
    pub fn kind(&self) -> &'static str {
        match self {
            WriteOp::InsertOne { .. } => "insert_one",
            WriteOp::UpdateOne { upsert: true, .. } => "upsert_one",
            WriteOp::UpdateOne { .. } => "update_one",
            WriteOp::UpdateMany { .. } => "update_many",
            WriteOp::DeleteOne { .. } => "delete_one",
            WriteOp::DeleteMany { .. } => "delete_many",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CascadeStep {
    pub collection: &'static str,
    pub op: WriteOp,
}

/// Ordered writes for one logical operation.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadePlan {
    name: &'static str,
    steps: Vec<CascadeStep>,
}

impl CascadePlan {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            steps: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn steps(&self) -> &[CascadeStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Distinct collections touched, in first-touch order.
    pub fn collections(&self) -> Vec<&'static str> {
        let mut seen = Vec::new();
        for step in &self.steps {
            if !seen.contains(&step.collection) {
                seen.push(step.collection);
            }
        }
        seen
    }

    fn push(mut self, collection: &'static str, op: WriteOp) -> Self {
        self.steps.push(CascadeStep { collection, op });
        self
    }

    pub fn insert_one(self, collection: &'static str, document: Document) -> Self {
        self.push(collection, WriteOp::InsertOne { document })
    }

    pub fn update_one(self, collection: &'static str, filter: Document, update: Document) -> Self {
        self.push(
            collection,
            WriteOp::UpdateOne {
                filter,
                update,
                upsert: false,
            },
        )
    }

    pub fn upsert_one(self, collection: &'static str, filter: Document, update: Document) -> Self {
        self.push(
            collection,
            WriteOp::UpdateOne {
                filter,
                update,
                upsert: true,
            },
        )
    }

    pub fn update_many(self, collection: &'static str, filter: Document, update: Document) -> Self {
        self.push(collection, WriteOp::UpdateMany { filter, update })
    }

    pub fn delete_one(self, collection: &'static str, filter: Document) -> Self {
        self.push(collection, WriteOp::DeleteOne { filter })
    }

    pub fn delete_many(self, collection: &'static str, filter: Document) -> Self {
        self.push(collection, WriteOp::DeleteMany { filter })
    }

    /// Appends the steps of `other`, keeping this plan's name.
    pub fn then(mut self, other: CascadePlan) -> Self {
        self.steps.extend(other.steps);
        self
    }
}

/// Write counts accumulated while executing a plan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CascadeReport {
    pub steps: u64,
    pub matched: u64,
    pub modified: u64,
    pub inserted: u64,
    pub upserted: u64,
    pub deleted: u64,
}

impl CascadeReport {
    pub fn merge(&mut self, other: CascadeReport) {
        self.steps += other.steps;
        self.matched += other.matched;
        self.modified += other.modified;
        self.inserted += other.inserted;
        self.upserted += other.upserted;
        self.deleted += other.deleted;
    }
}

/// Tag and actor names linked to a set of movies.
///
/// Tags and actors reference movies by title, so when several movies share
/// a title the links of the others decide which references must survive a
/// rename or delete of one of them.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct TitleLinks {
    pub tag_names: Vec<String>,
    pub actor_names: Vec<String>,
}

impl TitleLinks {
    pub fn of(movie: &Movie) -> Self {
        Self::from_movies(std::iter::once(movie))
    }

    /// Union of the links of `movies`, without duplicates.
    pub fn from_movies<'a>(movies: impl IntoIterator<Item = &'a Movie>) -> Self {
        let mut links = Self::default();
        for movie in movies {
            for tag in &movie.tag_names {
                if !links.tag_names.contains(tag) {
                    links.tag_names.push(tag.clone());
                }
            }
            for actor in &movie.actor_names {
                if !links.actor_names.contains(actor) {
                    links.actor_names.push(actor.clone());
                }
            }
        }
        links
    }

    pub fn has_tag(&self, tag_name: &str) -> bool {
        self.tag_names.iter().any(|t| t == tag_name)
    }
}

/// Narrows `filter` to documents whose `key` is not in `shared`.
fn excluding(mut filter: Document, key: &str, shared: &[String]) -> Document {
    if !shared.is_empty() {
        filter.insert(key, doc! { "$nin": shared.to_vec() });
    }
    filter
}

/// Sets `fields` on the movie and, when the title changes, rewrites the old
/// title wherever it is referenced.
///
/// Tags and actors reference movies by title only. `own` lists the ones
/// linked to this movie and `siblings` the ones linked to other movies with
/// the same old title. Ratings, user ratings and reviews carry the movie id
/// and are matched on it.
pub fn update_movie(
    movie_id: ObjectId,
    old_title: &str,
    mut fields: Document,
    new_title: Option<&str>,
    own: &TitleLinks,
    siblings: &TitleLinks,
) -> CascadePlan {
    let renamed = new_title.filter(|t| *t != old_title);
    if let Some(title) = renamed {
        fields.insert("title", title);
    } else {
        fields.remove("title");
    }

    let mut plan = CascadePlan::new(if renamed.is_some() {
        "rename_movie"
    } else {
        "update_movie"
    });
    if !fields.is_empty() {
        plan = plan.update_one(MOVIES, doc! { "_id": movie_id }, doc! { "$set": fields });
    }

    match renamed {
        Some(title) => plan.then(propagate_movie_title(
            movie_id, old_title, title, own, siblings,
        )),
        None => plan,
    }
}

/// Rewrites a movie title in the five collections that copy it.
///
/// The new title is added to the tags and actors of this movie. The old
/// title is then dropped everywhere except from tags and actors that a
/// same-titled sibling still links to.
pub fn propagate_movie_title(
    movie_id: ObjectId,
    old_title: &str,
    new_title: &str,
    own: &TitleLinks,
    siblings: &TitleLinks,
) -> CascadePlan {
    let mut plan = CascadePlan::new("propagate_movie_title");
    if !own.tag_names.is_empty() {
        plan = plan.update_many(
            TAGS,
            doc! { "tagName": { "$in": own.tag_names.clone() }, "movieTitles": old_title },
            doc! { "$addToSet": { "movieTitles": new_title } },
        );
    }
    plan = plan.update_many(
        TAGS,
        excluding(doc! { "movieTitles": old_title }, "tagName", &siblings.tag_names),
        doc! { "$pull": { "movieTitles": old_title } },
    );
    if !own.actor_names.is_empty() {
        plan = plan.update_many(
            ACTORS,
            doc! { "name": { "$in": own.actor_names.clone() }, "movies": old_title },
            doc! { "$addToSet": { "movies": new_title } },
        );
    }
    plan.update_many(
        ACTORS,
        excluding(doc! { "movies": old_title }, "name", &siblings.actor_names),
        doc! { "$pull": { "movies": old_title } },
    )
    .update_many(
        RATINGS,
        doc! { "movieId": movie_id },
        doc! { "$set": { "movieTitle": new_title } },
    )
    .update_many(
        USER_ASSOCIATED_RATINGS,
        doc! { "movieId": movie_id },
        doc! { "$set": { "movieTitle": new_title } },
    )
    .update_many(
        REVIEWS,
        doc! { "movieId": movie_id },
        doc! { "$set": { "movieTitle": new_title } },
    )
}

/// Removes a movie and everything that only exists because of it.
///
/// Tags and actors still linked to a same-titled sibling keep the title, so
/// they never end up empty because of this delete.
pub fn delete_movie(movie_id: ObjectId, title: &str, siblings: &TitleLinks) -> CascadePlan {
    CascadePlan::new("delete_movie")
        .delete_one(MOVIES, doc! { "_id": movie_id })
        .update_many(
            ACTORS,
            excluding(doc! { "movies": title }, "name", &siblings.actor_names),
            doc! { "$pull": { "movies": title } },
        )
        .update_many(
            TAGS,
            excluding(doc! { "movieTitles": title }, "tagName", &siblings.tag_names),
            doc! { "$pull": { "movieTitles": title } },
        )
        .delete_many(TAGS, doc! { "movieTitles": { "$size": 0 } })
        .delete_many(REVIEWS, doc! { "movieId": movie_id })
        .delete_many(RATINGS, doc! { "movieId": movie_id })
        .delete_many(USER_ASSOCIATED_RATINGS, doc! { "movieId": movie_id })
}

/// Links a tag and a movie in both directions, creating the tag if needed.
/// Applying it twice leaves the same state.
pub fn tag_movie(movie_id: ObjectId, movie_title: &str, tag_name: &str) -> CascadePlan {
    CascadePlan::new("tag_movie")
        .upsert_one(
            TAGS,
            doc! { "tagName": tag_name },
            doc! { "$addToSet": { "movieTitles": movie_title } },
        )
        .update_one(
            MOVIES,
            doc! { "_id": movie_id },
            doc! { "$addToSet": { "tagNames": tag_name } },
        )
}

/// Unlinks a tag from one movie; a tag left without movies is removed.
/// The tag keeps the title while a same-titled sibling still carries it.
pub fn untag_movie(
    movie_id: ObjectId,
    movie_title: &str,
    tag_name: &str,
    siblings: &TitleLinks,
) -> CascadePlan {
    let plan = CascadePlan::new("untag_movie").update_one(
        MOVIES,
        doc! { "_id": movie_id },
        doc! { "$pull": { "tagNames": tag_name } },
    );
    if siblings.has_tag(tag_name) {
        return plan;
    }
    plan.update_one(
        TAGS,
        doc! { "tagName": tag_name },
        doc! { "$pull": { "movieTitles": movie_title } },
    )
    .delete_one(
        TAGS,
        doc! { "tagName": tag_name, "movieTitles": { "$size": 0 } },
    )
}

/// Removes a tag from every movie and deletes it.
pub fn delete_tag(tag_name: &str) -> CascadePlan {
    CascadePlan::new("delete_tag")
        .update_many(
            MOVIES,
            doc! { "tagNames": tag_name },
            doc! { "$pull": { "tagNames": tag_name } },
        )
        .delete_one(TAGS, doc! { "tagName": tag_name })
}

/// Inserts an actor document and adds its name to the cast of `movie_ids`.
pub fn create_actor(actor: Document, name: &str, movie_ids: &[ObjectId]) -> CascadePlan {
    let plan = CascadePlan::new("create_actor").insert_one(ACTORS, actor);
    if movie_ids.is_empty() {
        return plan;
    }
    plan.update_many(
        MOVIES,
        doc! { "_id": { "$in": movie_ids.to_vec() } },
        doc! { "$addToSet": { "actorNames": name } },
    )
}

/// Renames an actor and rewrites the name in the casts of its movies.
pub fn rename_actor(
    actor_id: ObjectId,
    old_name: &str,
    new_name: &str,
    titles: &[String],
) -> CascadePlan {
    let plan = CascadePlan::new("rename_actor").update_one(
        ACTORS,
        doc! { "_id": actor_id },
        doc! { "$set": { "name": new_name } },
    );
    if old_name == new_name || titles.is_empty() {
        return plan;
    }
    plan.update_many(
        MOVIES,
        doc! { "title": { "$in": titles.to_vec() }, "actorNames": old_name },
        doc! { "$set": { "actorNames.$": new_name } },
    )
}

/// Titles to unlink and titles to link when moving from `current` to
/// `desired`. Both outputs keep input order and contain no duplicates.
pub fn diff_titles(current: &[String], desired: &[String]) -> (Vec<String>, Vec<String>) {
    let mut removed: Vec<String> = Vec::new();
    for title in current {
        if !desired.contains(title) && !removed.contains(title) {
            removed.push(title.clone());
        }
    }
    let mut added: Vec<String> = Vec::new();
    for title in desired {
        if !current.contains(title) && !added.contains(title) {
            added.push(title.clone());
        }
    }
    (removed, added)
}

/// Replaces an actor's filmography.
///
/// `desired` pairs each target movie's id with its title. Movies dropped
/// from the list lose the actor from their cast; new ones gain it.
pub fn replace_actor_movies(
    actor_id: ObjectId,
    name: &str,
    current: &[String],
    desired: &[(ObjectId, String)],
) -> CascadePlan {
    let desired_titles: Vec<String> = desired.iter().map(|(_, t)| t.clone()).collect();
    let (removed, added) = diff_titles(current, &desired_titles);
    let added_ids: Vec<ObjectId> = desired
        .iter()
        .filter(|(_, t)| added.contains(t))
        .map(|(id, _)| *id)
        .collect();

    let mut unique_titles: Vec<String> = Vec::new();
    for title in desired_titles {
        if !unique_titles.contains(&title) {
            unique_titles.push(title);
        }
    }

    let mut plan = CascadePlan::new("replace_actor_movies");
    if !removed.is_empty() {
        plan = plan.update_many(
            MOVIES,
            doc! { "title": { "$in": removed }, "actorNames": name },
            doc! { "$pull": { "actorNames": name } },
        );
    }
    if !added_ids.is_empty() {
        plan = plan.update_many(
            MOVIES,
            doc! { "_id": { "$in": added_ids } },
            doc! { "$addToSet": { "actorNames": name } },
        );
    }
    plan.update_one(
        ACTORS,
        doc! { "_id": actor_id },
        doc! { "$set": { "movies": unique_titles } },
    )
}

/// Deletes an actor and removes its name from the casts of its movies.
pub fn delete_actor(actor_id: ObjectId, name: &str, titles: &[String]) -> CascadePlan {
    let plan = CascadePlan::new("delete_actor").delete_one(ACTORS, doc! { "_id": actor_id });
    if titles.is_empty() {
        return plan;
    }
    plan.update_many(
        MOVIES,
        doc! { "title": { "$in": titles.to_vec() }, "actorNames": name },
        doc! { "$pull": { "actorNames": name } },
    )
}

/// Stores a rating, its per-user mirror, and attaches the category to the movie.
pub fn create_rating(rating: Document, movie_id: ObjectId, rating_name: &str) -> CascadePlan {
    CascadePlan::new("create_rating")
        .insert_one(RATINGS, rating.clone())
        .insert_one(USER_ASSOCIATED_RATINGS, rating)
        .update_one(
            MOVIES,
            doc! { "_id": movie_id },
            doc! { "$addToSet": { "ratingCategoryNames": rating_name } },
        )
}

fn own_rating_filter(user_name: &str, movie_id: ObjectId, rating_name: &str) -> Document {
    doc! { "userName": user_name, "movieId": movie_id, "ratingName": rating_name }
}

/// Changes a user's score in both rating collections.
pub fn update_user_rating(
    user_name: &str,
    movie_id: ObjectId,
    rating_name: &str,
    user_rating: i32,
) -> CascadePlan {
    let filter = own_rating_filter(user_name, movie_id, rating_name);
    let update = doc! { "$set": { "userRating": user_rating } };
    CascadePlan::new("update_user_rating")
        .update_one(RATINGS, filter.clone(), update.clone())
        .update_one(USER_ASSOCIATED_RATINGS, filter, update)
}

/// Removes a user's rating; when nobody else rated the movie in that
/// category the category is detached from the movie.
pub fn delete_user_rating(
    user_name: &str,
    movie_id: ObjectId,
    rating_name: &str,
    category_still_used: bool,
) -> CascadePlan {
    let filter = own_rating_filter(user_name, movie_id, rating_name);
    let plan = CascadePlan::new("delete_user_rating")
        .delete_one(RATINGS, filter.clone())
        .delete_one(USER_ASSOCIATED_RATINGS, filter);
    if category_still_used {
        return plan;
    }
    plan.update_one(
        MOVIES,
        doc! { "_id": movie_id },
        doc! { "$pull": { "ratingCategoryNames": rating_name } },
    )
}

/// Renames a rating category everywhere it is stored.
pub fn rename_rating_category(old_name: &str, new_name: &str) -> CascadePlan {
    let plan = CascadePlan::new("rename_rating_category");
    if old_name == new_name {
        return plan;
    }
    plan.update_many(
        RATINGS,
        doc! { "ratingName": old_name },
        doc! { "$set": { "ratingName": new_name } },
    )
    .update_many(
        USER_ASSOCIATED_RATINGS,
        doc! { "ratingName": old_name },
        doc! { "$set": { "ratingName": new_name } },
    )
    .update_many(
        MOVIES,
        doc! { "ratingCategoryNames": old_name },
        doc! { "$set": { "ratingCategoryNames.$": new_name } },
    )
}
