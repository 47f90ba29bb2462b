use crate::{Activity, Edition, Platform, Playing, Reading, ReadingStatus, TrackedItem};
use indoc::indoc;
use time::macros::date;
use trove::{Executor, Session, TypeRegistry, params};

const INSERT: &str = indoc! {"
    INSERT INTO tracked_item (title, status, edition, tags, activity)
    VALUES (:title, :status, :edition, :tags, :activity)
    RETURNING id
"};

pub async fn round_trip<E: Executor>(executor: &mut E, registry: &TypeRegistry) {
    let mut session = Session::new(executor, registry);
    let mut items = vec![
        TrackedItem {
            id: 0,
            title: "The Legend of Zelda: Breath of the Wild".into(),
            status: ReadingStatus::ReadingNow,
            edition: Some(Edition {
                status: ReadingStatus::Finished,
                platforms: vec![
                    Platform {
                        name: "Switch".into(),
                        release_year: 2017,
                        regions: vec!["EU".into(), "JP".into(), "US".into()],
                    },
                    Platform {
                        name: "Wii U".into(),
                        release_year: 2017,
                        regions: vec![],
                    },
                ],
                published: Some(date!(2017 - 03 - 03)),
            }),
            tags: vec!["open world".into(), "it's dangerous to go alone".into()],
            activity: Some(Activity::Playing(Playing {
                minutes: 95,
                platform: "Switch".into(),
            })),
            note: String::new(),
        },
        TrackedItem {
            id: 0,
            title: "Dune".into(),
            status: ReadingStatus::Abandoned,
            edition: Some(Edition {
                status: ReadingStatus::Planned,
                platforms: vec![],
                published: None,
            }),
            tags: vec![],
            activity: Some(Activity::Reading(Reading {
                pages: 412,
                chapter: None,
            })),
            note: String::new(),
        },
        TrackedItem {
            id: 0,
            title: "Planned and nothing else".into(),
            status: ReadingStatus::Planned,
            edition: None,
            tags: vec!["backlog".into()],
            activity: None,
            note: String::new(),
        },
    ];
    for item in items.iter_mut() {
        item.id = session
            .fetch_scalar::<i64>(
                INSERT,
                params! {
                    "title" => item.title.clone(),
                    "status" => item.status,
                    "edition" => item.edition.clone(),
                    "tags" => item.tags.clone(),
                    "activity" => item.activity.clone(),
                },
            )
            .await
            .expect("Could not insert a tracked item");
    }

    for item in &items {
        let loaded = session
            .fetch_single::<TrackedItem>(
                "SELECT * FROM tracked_item WHERE id = :id",
                params! { "id" => item.id },
            )
            .await
            .expect("Could not read a tracked item back");
        assert_eq!(loaded.as_ref(), Some(item));
    }

    let titles = session
        .fetch_scalar_column::<String>(
            "SELECT title FROM tracked_item WHERE status = ANY(:statuses) ORDER BY title",
            params! { "statuses" => vec![ReadingStatus::Planned, ReadingStatus::Abandoned] },
        )
        .await
        .expect("Could not filter by status");
    assert_eq!(titles, ["Dune", "Planned and nothing else"]);

    let statuses = session
        .fetch_scalar::<Vec<ReadingStatus>>(
            "SELECT array_agg(status ORDER BY title) FROM tracked_item",
            params!(),
        )
        .await
        .expect("Could not read an array of enums");
    assert_eq!(
        statuses,
        [
            ReadingStatus::Abandoned,
            ReadingStatus::Planned,
            ReadingStatus::ReadingNow
        ]
    );

    let all = session
        .fetch_list::<TrackedItem>("SELECT * FROM tracked_item ORDER BY id", params!())
        .await
        .expect("Could not list the tracked items");
    assert_eq!(all, items);

    let count = session
        .execute(
            "UPDATE tracked_item SET tags = :tags WHERE title LIKE '%:title%'",
            params! { "tags" => Vec::<String>::new() },
        )
        .await
        .expect("Placeholders inside literals must be left alone");
    assert_eq!(count, 0);
}
