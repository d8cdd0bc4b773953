use couch_core::{
    random_token, AdminsOnly, Change, MediaItem, MediaSource, Playlist, RequestError,
};
use serde_json::{Map, Value};

use crate::{CollabResult, Database, Permission, Request, RoomField};

/// Applies an edit to the playlist of the sender's room, broadcasting the new state if it changed
async fn edit_playlist<Db, F>(
    request: &mut Request<'_, Db>,
    room_id: &str,
    edit: F,
) -> CollabResult<()>
where
    Db: Database,
    F: FnOnce(&mut Playlist) -> Result<Change, RequestError> + Send,
{
    request
        .check_permission(room_id, Permission::Action(AdminsOnly::Dj))
        .await?;

    let mut playlist = request.require_room().await?.playlist();

    if edit(&mut playlist)? == Change::Unchanged {
        return Ok(());
    }

    request.update_room(&[RoomField::Playlist(playlist)]).await?;
    request.broadcast_room_state().await
}

pub async fn add<Db: Database>(
    request: &mut Request<'_, Db>,
    room_id: String,
    name: String,
    kind: String,
    content: Map<String, Value>,
) -> CollabResult<()> {
    let id = random_token(request.context().config.item_id_length);

    edit_playlist(request, &room_id, move |playlist| {
        let source = MediaSource::from_content(&kind, &content)?;
        playlist.add(MediaItem { id, name, source });

        Ok(Change::Changed)
    })
    .await
}

pub async fn rearrange<Db: Database>(
    request: &mut Request<'_, Db>,
    room_id: String,
    media_id: String,
    media_id_after: String,
) -> CollabResult<()> {
    // Rejected before anything is looked up
    if media_id == media_id_after {
        return Err(RequestError::client_error("Cannot rearrange the same item").into());
    }

    edit_playlist(request, &room_id, |playlist| {
        playlist.rearrange(&media_id, &media_id_after)
    })
    .await
}

pub async fn play<Db: Database>(
    request: &mut Request<'_, Db>,
    room_id: String,
    start: f64,
) -> CollabResult<()> {
    edit_playlist(request, &room_id, |playlist| {
        playlist.play(start).map(|_| Change::Changed)
    })
    .await
}

pub async fn pause<Db: Database>(
    request: &mut Request<'_, Db>,
    room_id: String,
    paused: f64,
) -> CollabResult<()> {
    edit_playlist(request, &room_id, |playlist| {
        playlist.pause(paused).map(|_| Change::Changed)
    })
    .await
}

pub async fn load<Db: Database>(
    request: &mut Request<'_, Db>,
    room_id: String,
    media_id: String,
) -> CollabResult<()> {
    edit_playlist(request, &room_id, |playlist| {
        playlist.load(&media_id).map(|_| Change::Changed)
    })
    .await
}

pub async fn remove<Db: Database>(
    request: &mut Request<'_, Db>,
    room_id: String,
    media_id: String,
) -> CollabResult<()> {
    edit_playlist(request, &room_id, |playlist| Ok(playlist.remove(&media_id))).await
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use crate::{testing::TestCollab, Consistency};

    use super::*;

    fn add_message(room_id: &str, video: &str) -> Value {
        json!({ "type": "room_media_add", "info": {
            "room_id": room_id,
            "media_name": format!("Video {video}"),
            "media_type": "youtube",
            "media_content": { "id": video },
        } })
    }

    async fn media_ids(test: &TestCollab, room_id: &str) -> Vec<String> {
        let room = test
            .collab
            .database()
            .room(room_id, Consistency::Strong)
            .await
            .unwrap();

        room.media.into_iter().map(|m| m.id).collect()
    }

    #[tokio::test]
    async fn test_add_loads_first_item() {
        let test = TestCollab::new();
        let (room_id, _) = test.create_room("admin").await;
        test.join("guest", &room_id).await;
        test.transport.clear();

        test.send("admin", add_message(&room_id, "abc")).await;

        for socket in ["admin", "guest"] {
            let messages = test.transport.take(socket);
            let info = &messages[0]["info"];

            assert_eq!(messages.len(), 1);
            assert_eq!(messages[0]["type"], "room_state");
            assert_eq!(info["media"][0]["name"], "Video abc");
            assert_eq!(info["media"][0]["content"], json!({ "id": "abc" }));
            assert_eq!(info["media"][0]["id"].as_str().unwrap().len(), 8);
            assert_eq!(info["loaded"], 0);
            assert_eq!(info["paused"], 0.);
        }
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_content() {
        let test = TestCollab::new();
        let (room_id, _) = test.create_room("admin").await;

        test.send(
            "admin",
            json!({ "type": "room_media_add", "info": {
                "room_id": room_id,
                "media_name": "Clip",
                "media_type": "vimeo",
                "media_content": { "id": "abc" },
            } }),
        )
        .await;

        let messages = test.transport.take("admin");
        assert_eq!(messages[0]["type"], "client_error");
        assert_eq!(messages[0]["info"]["message"], "Invalid media type: vimeo");
        assert!(media_ids(&test, &room_id).await.is_empty());
    }

    #[tokio::test]
    async fn test_guests_cannot_dj_by_default() {
        let test = TestCollab::new();
        let (room_id, _) = test.create_room("admin").await;
        test.join("guest", &room_id).await;
        test.transport.clear();

        test.send("guest", add_message(&room_id, "abc")).await;

        let messages = test.transport.take("guest");
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0]["type"], "client_confused");
        assert_eq!(messages[0]["info"]["message"], "Only admins can do that");
        assert_eq!(messages[0]["info"]["received"]["type"], "room_media_add");
        assert!(
            test.transport.take("admin").is_empty(),
            "nothing should be broadcast when a guest is denied"
        );

        test.send(
            "admin",
            json!({ "type": "room_admins_only_dj", "info": { "room_id": room_id, "room_admins_only": false } }),
        )
        .await;
        test.send("guest", add_message(&room_id, "abc")).await;

        assert_eq!(media_ids(&test, &room_id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_guest_play_is_denied_without_changes() {
        let test = TestCollab::new();
        let (room_id, _) = test.create_room("admin").await;
        test.join("guest", &room_id).await;
        test.send("admin", add_message(&room_id, "abc")).await;

        let database = test.collab.database();
        let before = database.room(&room_id, Consistency::Strong).await.unwrap();
        test.transport.clear();

        test.send(
            "guest",
            json!({ "type": "room_media_play", "info": { "room_id": room_id, "room_start": 1700000000.0 } }),
        )
        .await;

        let messages = test.transport.take("guest");
        assert_eq!(messages.len(), 1, "the guest should only get the denial");
        assert_eq!(messages[0]["type"], "client_confused");
        assert_eq!(messages[0]["info"]["message"], "Only admins can do that");
        assert_eq!(messages[0]["info"]["received"]["type"], "room_media_play");
        assert!(
            test.transport.take("admin").is_empty(),
            "nothing should be broadcast when a guest is denied"
        );

        let after = database.room(&room_id, Consistency::Strong).await.unwrap();
        assert_eq!(after.playback, before.playback, "playback should be untouched");
        assert_eq!(after.media, before.media);
    }

    #[tokio::test]
    async fn test_play_pause_and_load() {
        let test = TestCollab::new();
        let (room_id, _) = test.create_room("admin").await;

        test.send(
            "admin",
            json!({ "type": "room_media_play", "info": { "room_id": room_id, "room_start": 1700000000.0 } }),
        )
        .await;
        assert_eq!(
            test.transport.take("admin")[0]["info"]["message"],
            "No media item to play"
        );

        test.send("admin", add_message(&room_id, "a")).await;
        test.send("admin", add_message(&room_id, "b")).await;
        test.send(
            "admin",
            json!({ "type": "room_media_play", "info": { "room_id": room_id, "room_start": 1700000000.0 } }),
        )
        .await;
        test.send(
            "admin",
            json!({ "type": "room_media_pause", "info": { "room_id": room_id, "room_paused": -5 } }),
        )
        .await;

        let messages = test.transport.take("admin");
        let playing = &messages[2]["info"];
        assert_eq!(playing["start"], 1700000000.0);
        assert_eq!(playing["paused"], Value::Null);
        assert_eq!(messages[3]["type"], "client_error");
        assert_eq!(
            messages[3]["info"]["message"],
            "Value for 'paused' cannot be negative"
        );

        let second = media_ids(&test, &room_id).await.remove(1);
        test.send(
            "admin",
            json!({ "type": "room_media_load", "info": { "room_id": room_id, "media_id": second } }),
        )
        .await;

        let loaded = &test.transport.take("admin")[0]["info"];
        assert_eq!(loaded["loaded"], 1);
        assert_eq!(loaded["start"], Value::Null);
        assert_eq!(loaded["paused"], 0.);
    }

    #[tokio::test]
    async fn test_rearrange() {
        let test = TestCollab::new();
        let (room_id, _) = test.create_room("admin").await;

        for video in ["a", "b"] {
            test.send("admin", add_message(&room_id, video)).await;
        }

        let ids = media_ids(&test, &room_id).await;
        test.transport.clear();

        let rearrange = json!({ "type": "room_media_rearrange", "info": {
            "room_id": room_id,
            "media_id": ids[1],
            "media_id_after": ids[0],
        } });

        test.send("admin", rearrange.clone()).await;
        assert_eq!(media_ids(&test, &room_id).await, vec![ids[1].clone(), ids[0].clone()]);
        assert_eq!(test.transport.take("admin").len(), 1);

        test.send("admin", rearrange).await;
        assert!(
            test.transport.take("admin").is_empty(),
            "a repeated rearrange should change nothing and broadcast nothing"
        );

        test.send(
            "admin",
            json!({ "type": "room_media_rearrange", "info": {
                "room_id": "elsewhere",
                "media_id": ids[0],
                "media_id_after": ids[0],
            } }),
        )
        .await;
        assert_eq!(
            test.transport.take("admin")[0]["info"]["message"],
            "Cannot rearrange the same item",
            "the same item should be rejected before the room is checked"
        );
    }

    #[tokio::test]
    async fn test_remove() {
        let test = TestCollab::new();
        let (room_id, _) = test.create_room("admin").await;
        test.send("admin", add_message(&room_id, "a")).await;

        let id = media_ids(&test, &room_id).await.remove(0);
        test.transport.clear();

        let remove = json!({ "type": "room_media_remove", "info": { "room_id": room_id, "media_id": id } });

        test.send("admin", remove.clone()).await;
        let state = &test.transport.take("admin")[0]["info"];
        assert_eq!(state["media"], json!([]));
        assert_eq!(state["loaded"], Value::Null);

        test.send("admin", remove).await;
        assert!(
            test.transport.take("admin").is_empty(),
            "removing a missing item should do nothing"
        );
    }
}
