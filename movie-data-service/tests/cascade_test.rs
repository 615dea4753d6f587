mod common;

use mongodb::bson::doc;
use movie_data_service::services::database::collections::{MOVIES, TAGS};
use movie_data_service::services::{parse_object_id, CascadePlan};
use reqwest::StatusCode;
use serde_json::{json, Value};
use service_core::error::AppError;

use common::{TestApp, ANA_SESSION, BO_SESSION};

async fn get_json(app: &TestApp, path: &str) -> Value {
    app.get(path, ANA_SESSION)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

fn sorted(value: &Value) -> Vec<String> {
    let mut items: Vec<String> = value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect();
    items.sort();
    items
}

#[tokio::test]
#[ignore = "Requires MongoDB"]
async fn renaming_a_movie_updates_every_reference() {
    let app = TestApp::spawn().await;
    let movie_id = app.create_movie("Gremlins").await;

    app.post(&format!("/movies/{}/tags", movie_id), ANA_SESSION)
        .json(&json!({ "tagName": "Creature" }))
        .send()
        .await
        .unwrap();
    app.post("/actors", ANA_SESSION)
        .json(&json!({ "name": "Zach Galligan", "dob": "1964-02-14", "movieIds": [movie_id] }))
        .send()
        .await
        .unwrap();
    app.post(&format!("/movies/{}/ratings", movie_id), ANA_SESSION)
        .json(&json!({ "ratingName": "Fun", "userRating": 4, "upperbound": 5 }))
        .send()
        .await
        .unwrap();
    app.post(&format!("/movies/{}/reviews", movie_id), ANA_SESSION)
        .json(&json!({ "reviewTitle": "Great", "reviewDescription": "Mogwai!" }))
        .send()
        .await
        .unwrap();

    let response = app
        .patch(&format!("/movies/{}", movie_id), ANA_SESSION)
        .json(&json!({ "title": "Gremlins 2" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let tag: Value = app
        .get("/tags/Creature", ANA_SESSION)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tag["movieTitles"], json!(["Gremlins 2"]));

    let actors: Value = app
        .get("/actors?name=Zach%20Galligan", ANA_SESSION)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(actors[0]["movies"], json!(["Gremlins 2"]));

    let ratings: Value = app
        .get("/ratings/me", ANA_SESSION)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ratings[0]["movieTitle"], "Gremlins 2");

    let stored = app
        .db
        .ratings()
        .count_documents(doc! { "movieTitle": "Gremlins 2" }, None)
        .await
        .unwrap();
    assert_eq!(stored, 1);

    let reviews: Value = app
        .get("/reviews/me", ANA_SESSION)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(reviews[0]["movieTitle"], "Gremlins 2");

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires MongoDB"]
async fn tags_stay_bidirectional() {
    let app = TestApp::spawn().await;
    let movie_id = app.create_movie("Tremors").await;
    let tags_path = format!("/movies/{}/tags", movie_id);

    for _ in 0..2 {
        let response = app
            .post(&tags_path, ANA_SESSION)
            .json(&json!({ "tagName": "Worms" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let movie: Value = app
        .get(&format!("/movies/{}", movie_id), ANA_SESSION)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(movie["tagNames"], json!(["Worms"]));

    let response = app
        .delete(&format!("{}/Worms", tags_path), ANA_SESSION)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app.get("/tags/Worms", ANA_SESSION).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .delete(&format!("{}/Worms", tags_path), ANA_SESSION)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires MongoDB"]
async fn deleting_a_movie_removes_dependents() {
    let app = TestApp::spawn().await;
    let kept = app.create_movie("Innerspace").await;
    let doomed = app.create_movie("Small Soldiers").await;

    for id in [&kept, &doomed] {
        app.post(&format!("/movies/{}/tags", id), ANA_SESSION)
            .json(&json!({ "tagName": "Dante" }))
            .send()
            .await
            .unwrap();
    }
    app.post(&format!("/movies/{}/tags", doomed), ANA_SESSION)
        .json(&json!({ "tagName": "Toys" }))
        .send()
        .await
        .unwrap();
    app.post(&format!("/movies/{}/ratings", doomed), ANA_SESSION)
        .json(&json!({ "ratingName": "Fun", "userRating": 3, "upperbound": 5 }))
        .send()
        .await
        .unwrap();

    let response = app
        .delete(&format!("/movies/{}", doomed), ANA_SESSION)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let dante: Value = app
        .get("/tags/Dante", ANA_SESSION)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(dante["movieTitles"], json!(["Innerspace"]));

    let toys = app.get("/tags/Toys", ANA_SESSION).send().await.unwrap();
    assert_eq!(toys.status(), StatusCode::NOT_FOUND);

    let mirrors = app
        .db
        .user_associated_ratings()
        .count_documents(doc! {}, None)
        .await
        .unwrap();
    assert_eq!(mirrors, 0);

    let response = app
        .get(&format!("/movies/{}", doomed), ANA_SESSION)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires MongoDB"]
async fn rating_categories_enforce_bounds_and_uniqueness() {
    let app = TestApp::spawn().await;
    let movie_id = app.create_movie("Explorers").await;
    let path = format!("/movies/{}/ratings", movie_id);

    let created = app
        .post(&path, ANA_SESSION)
        .json(&json!({ "ratingName": "Wonder", "userRating": 4, "upperbound": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let duplicate = app
        .post(&path, ANA_SESSION)
        .json(&json!({ "ratingName": "Wonder", "userRating": 2, "upperbound": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let wrong_bound = app
        .post(&path, BO_SESSION)
        .json(&json!({ "ratingName": "Wonder", "userRating": 2, "upperbound": 10 }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_bound.status(), StatusCode::BAD_REQUEST);

    let out_of_range = app
        .post(&path, BO_SESSION)
        .json(&json!({ "ratingName": "Wonder", "userRating": 7, "upperbound": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(out_of_range.status(), StatusCode::BAD_REQUEST);

    app.post(&path, BO_SESSION)
        .json(&json!({ "ratingName": "Wonder", "userRating": 2, "upperbound": 5 }))
        .send()
        .await
        .unwrap();

    let summary: Value = app
        .get(&format!("{}/summary", path), ANA_SESSION)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(summary["totalRatings"], 2);
    assert_eq!(summary["mostPopular"]["ratingName"], "Wonder");
    assert_eq!(summary["mostPopular"]["average"], 3.0);

    let renamed = app
        .patch("/ratings/categories/Wonder", ANA_SESSION)
        .json(&json!({ "ratingName": "Awe" }))
        .send()
        .await
        .unwrap();
    assert_eq!(renamed.status(), StatusCode::NO_CONTENT);

    let movie: Value = app
        .get(&format!("/movies/{}", movie_id), ANA_SESSION)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(movie["ratingCategoryNames"], json!(["Awe"]));

    for session in [ANA_SESSION, BO_SESSION] {
        let response = app
            .delete(&format!("{}/Awe", path), session)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    let movie: Value = app
        .get(&format!("/movies/{}", movie_id), ANA_SESSION)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(movie["ratingCategoryNames"], json!([]));

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires MongoDB"]
async fn only_authors_edit_reviews() {
    let app = TestApp::spawn().await;
    let movie_id = app.create_movie("The Howling").await;

    let review: Value = app
        .post(&format!("/movies/{}/reviews", movie_id), ANA_SESSION)
        .json(&json!({
            "reviewTitle": "Hairy",
            "reviewDescription": "Great transformation scene.",
            "privacy": "private"
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let review_path = format!("/reviews/{}", review["id"].as_str().unwrap());

    let forbidden = app
        .patch(&review_path, BO_SESSION)
        .json(&json!({ "reviewTitle": "Mine now" }))
        .send()
        .await
        .unwrap();
    assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

    let visible_to_bo: Value = app
        .get(&format!("/movies/{}/reviews", movie_id), BO_SESSION)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(visible_to_bo, json!([]));

    let updated: Value = app
        .patch(&review_path, ANA_SESSION)
        .json(&json!({ "privacy": "public" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["privacy"], "public");

    let deleted = app.delete(&review_path, ANA_SESSION).send().await.unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires MongoDB"]
async fn same_titled_movies_keep_their_links() {
    let app = TestApp::spawn().await;
    let original = app.create_movie("The Thing").await;
    let remake = app.create_movie("The Thing").await;

    for id in [&original, &remake] {
        app.post(&format!("/movies/{}/tags", id), ANA_SESSION)
            .json(&json!({ "tagName": "Antarctica" }))
            .send()
            .await
            .unwrap();
    }

    let response = app
        .patch(&format!("/movies/{}", original), ANA_SESSION)
        .json(&json!({ "title": "The Thing (1982)" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let tag = get_json(&app, "/tags/Antarctica").await;
    assert_eq!(
        sorted(&tag["movieTitles"]),
        vec!["The Thing", "The Thing (1982)"]
    );

    let response = app
        .delete(&format!("/movies/{}/tags/Antarctica", original), ANA_SESSION)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let tag = get_json(&app, "/tags/Antarctica").await;
    assert_eq!(tag["movieTitles"], json!(["The Thing"]));

    app.post(&format!("/movies/{}/tags", original), ANA_SESSION)
        .json(&json!({ "tagName": "Antarctica" }))
        .send()
        .await
        .unwrap();
    let response = app
        .patch(&format!("/movies/{}", original), ANA_SESSION)
        .json(&json!({ "title": "The Thing" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .delete(&format!("/movies/{}", remake), ANA_SESSION)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let tag = get_json(&app, "/tags/Antarctica").await;
    assert_eq!(tag["movieTitles"], json!(["The Thing"]));
    let survivor = get_json(&app, &format!("/movies/{}", original)).await;
    assert_eq!(survivor["tagNames"], json!(["Antarctica"]));

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires MongoDB"]
async fn actor_changes_reach_movie_casts() {
    let app = TestApp::spawn().await;
    let piranha = app.create_movie("Piranha").await;
    let matinee = app.create_movie("Matinee").await;

    let created = app
        .post("/actors", ANA_SESSION)
        .json(&json!({ "name": "Dick Miller", "dob": "1928-12-25", "movieIds": [piranha] }))
        .send()
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    let actor: Value = created.json().await.unwrap();
    let actor_path = format!("/actors/{}", actor["id"].as_str().unwrap());
    assert_eq!(actor["movies"], json!(["Piranha"]));

    let movie = get_json(&app, &format!("/movies/{}", piranha)).await;
    assert_eq!(movie["actorNames"], json!(["Dick Miller"]));

    let updated = app
        .patch(&actor_path, ANA_SESSION)
        .json(&json!({ "name": "Richard Miller", "movieIds": [matinee] }))
        .send()
        .await
        .unwrap();
    assert_eq!(updated.status(), StatusCode::OK);
    let actor: Value = updated.json().await.unwrap();
    assert_eq!(actor["name"], "Richard Miller");
    assert_eq!(actor["movies"], json!(["Matinee"]));

    let old = get_json(&app, &format!("/movies/{}", piranha)).await;
    assert_eq!(old["actorNames"], json!([]));
    let new = get_json(&app, &format!("/movies/{}", matinee)).await;
    assert_eq!(new["actorNames"], json!(["Richard Miller"]));

    let deleted = app.delete(&actor_path, ANA_SESSION).send().await.unwrap();
    assert_eq!(deleted.status(), StatusCode::NO_CONTENT);
    let new = get_json(&app, &format!("/movies/{}", matinee)).await;
    assert_eq!(new["actorNames"], json!([]));

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires MongoDB"]
async fn deleting_a_tag_detaches_it_from_every_movie() {
    let app = TestApp::spawn().await;
    let first = app.create_movie("Hollywood Boulevard").await;
    let second = app.create_movie("Eight Hundred Leagues Down the Amazon").await;

    for id in [&first, &second] {
        for tag in ["Cult", "Cheap"] {
            app.post(&format!("/movies/{}/tags", id), ANA_SESSION)
                .json(&json!({ "tagName": tag }))
                .send()
                .await
                .unwrap();
        }
    }

    let response = app.delete("/tags/Cult", ANA_SESSION).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    for id in [&first, &second] {
        let movie = get_json(&app, &format!("/movies/{}", id)).await;
        assert_eq!(movie["tagNames"], json!(["Cheap"]));
    }
    let response = app.get("/tags/Cult", ANA_SESSION).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.delete("/tags/Cult", ANA_SESSION).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires MongoDB"]
async fn listings_are_ordered_and_enriched() {
    let app = TestApp::spawn().await;
    let older = app.create_movie_released("Piranha", "1978-08-03").await;
    let newer = app.create_movie_released("Gremlins", "1984-06-08").await;

    for tag in ["Creature", "Comedy", "Christmas", "Suburbia"] {
        app.post(&format!("/movies/{}/tags", newer), ANA_SESSION)
            .json(&json!({ "tagName": tag }))
            .send()
            .await
            .unwrap();
    }
    app.post(&format!("/movies/{}/ratings", newer), ANA_SESSION)
        .json(&json!({ "ratingName": "Fun", "userRating": 4, "upperbound": 5 }))
        .send()
        .await
        .unwrap();
    app.post(&format!("/movies/{}/ratings", newer), BO_SESSION)
        .json(&json!({ "ratingName": "Fun", "userRating": 1, "upperbound": 5, "privacy": "private" }))
        .send()
        .await
        .unwrap();
    for title in ["Bitey", "Still bitey"] {
        app.post(&format!("/movies/{}/reviews", older), ANA_SESSION)
            .json(&json!({ "reviewTitle": title, "reviewDescription": "Fish." }))
            .send()
            .await
            .unwrap();
    }
    app.post(&format!("/movies/{}/reviews", newer), ANA_SESSION)
        .json(&json!({ "reviewTitle": "Cute", "reviewDescription": "Until midnight." }))
        .send()
        .await
        .unwrap();

    let recent = get_json(&app, "/movies/recent?limit=5").await;
    assert_eq!(recent[0]["id"], newer.as_str());
    assert_eq!(recent[1]["id"], older.as_str());
    assert_eq!(recent[0]["mostPopularRatingCategory"], "Fun");
    assert_eq!(recent[0]["mostPopRatingUpperBound"], 5);
    assert_eq!(recent[0]["mostPopRatingAvg"], 4.0);
    assert_eq!(recent[0]["attachedTags"].as_array().unwrap().len(), 3);

    let reviewed = get_json(&app, "/movies/most-reviewed").await;
    assert_eq!(reviewed[0]["id"], older.as_str());
    assert_eq!(reviewed[1]["id"], newer.as_str());

    let bo_view: Value = app
        .get(&format!("/movies/{}/ratings/summary", newer), BO_SESSION)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(bo_view["totalRatings"], 2);
    let ana_view = get_json(&app, &format!("/movies/{}/ratings/summary", newer)).await;
    assert_eq!(ana_view["totalRatings"], 1);

    app.cleanup().await;
}

/// Renames a movie, then inserts a tag whose name is already taken.
fn plan_failing_at_second_step(movie_id: &str) -> CascadePlan {
    CascadePlan::new("failing_plan")
        .update_one(
            MOVIES,
            doc! { "_id": parse_object_id(movie_id).unwrap() },
            doc! { "$set": { "title": "Changed" } },
        )
        .insert_one(TAGS, doc! { "tagName": "Taken", "movieTitles": [] })
}

#[tokio::test]
#[ignore = "Requires MongoDB"]
async fn sequential_cascade_reports_partial_progress() {
    let app = TestApp::spawn().await;
    let movie_id = app.create_movie("Innerspace").await;
    app.post(&format!("/movies/{}/tags", movie_id), ANA_SESSION)
        .json(&json!({ "tagName": "Taken" }))
        .send()
        .await
        .unwrap();

    let result = app.db.apply(&plan_failing_at_second_step(&movie_id)).await;
    assert!(matches!(
        result,
        Err(AppError::CascadeFailed {
            step: 1,
            applied: 1,
            transactional: false,
            ..
        })
    ));

    let movie = get_json(&app, &format!("/movies/{}", movie_id)).await;
    assert_eq!(movie["title"], "Changed");

    app.cleanup().await;
}

#[tokio::test]
#[ignore = "Requires a MongoDB replica set"]
async fn transactional_cascade_rolls_back_on_failure() {
    let app = TestApp::spawn_transactional().await;
    assert!(app.db.transactions_enabled());
    let movie_id = app.create_movie("Innerspace").await;
    app.post(&format!("/movies/{}/tags", movie_id), ANA_SESSION)
        .json(&json!({ "tagName": "Taken" }))
        .send()
        .await
        .unwrap();

    let result = app.db.apply(&plan_failing_at_second_step(&movie_id)).await;
    assert!(matches!(
        result,
        Err(AppError::CascadeFailed {
            step: 1,
            applied: 0,
            transactional: true,
            ..
        })
    ));

    let movie = get_json(&app, &format!("/movies/{}", movie_id)).await;
    assert_eq!(movie["title"], "Innerspace");

    let response = app
        .patch(&format!("/movies/{}", movie_id), ANA_SESSION)
        .json(&json!({ "title": "Innerspace (1987)" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let tag = get_json(&app, "/tags/Taken").await;
    assert_eq!(tag["movieTitles"], json!(["Innerspace (1987)"]));

    app.cleanup().await;
}
