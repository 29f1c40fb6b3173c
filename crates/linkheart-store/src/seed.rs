//! The fixed demo dataset and the operations that (re)install it.

use linkheart_shared::{Gender, UserId};
use tracing::info;

use crate::backend::CollectionKind;
use crate::error::Result;
use crate::models::{Like, Match, Message, User};
use crate::store::{Batch, Store};

#[allow(clippy::too_many_arguments)]
fn seed_user(
    id: &str,
    name: &str,
    age: u8,
    gender: Gender,
    location: &str,
    bio: &str,
    interests: &[&str],
    photos: &[&str],
) -> User {
    User {
        id: UserId::from(id),
        name: name.to_string(),
        age,
        gender,
        location: location.to_string(),
        bio: bio.to_string(),
        interests: interests.iter().map(|s| s.to_string()).collect(),
        photos: photos.iter().map(|s| s.to_string()).collect(),
        is_admin: false,
    }
}

/// Four regular profiles followed by the single admin account.
pub fn seed_users() -> Vec<User> {
    let mut admin = seed_user(
        "admin_1",
        "Admin User",
        99,
        Gender::Other,
        "System",
        "Developer Account",
        &[],
        &["https://picsum.photos/seed/admin/400/600"],
    );
    admin.is_admin = true;

    vec![
        seed_user(
            "user_1",
            "Kenji",
            26,
            Gender::Male,
            "東京",
            "都内でエンジニアをしています。休日はカフェで本を読んだりしてます。よろしくお願いします！",
            &["カフェ巡り", "読書", "技術"],
            &[
                "https://picsum.photos/seed/kenji1/400/600",
                "https://picsum.photos/seed/kenji2/400/600",
            ],
        ),
        seed_user(
            "user_2",
            "Ayaka",
            24,
            Gender::Female,
            "横浜",
            "旅行と美味しいものを食べるのが大好きです🍰 仲良くしてください♪",
            &["旅行", "料理", "映画鑑賞"],
            &[
                "https://picsum.photos/seed/ayaka1/400/600",
                "https://picsum.photos/seed/ayaka2/400/600",
            ],
        ),
        seed_user(
            "user_3",
            "Hiro",
            28,
            Gender::Male,
            "埼玉",
            "アウトドア派です！キャンプとか一緒に行ける人と出会えたら嬉しいです。",
            &["アウトドア", "筋トレ", "写真"],
            &["https://picsum.photos/seed/hiro1/400/600"],
        ),
        seed_user(
            "user_4",
            "Mio",
            23,
            Gender::Female,
            "東京",
            "看護師してます。最近ジムに通い始めました！",
            &["筋トレ", "音楽", "ショッピング"],
            &[
                "https://picsum.photos/seed/mio1/400/600",
                "https://picsum.photos/seed/mio2/400/600",
            ],
        ),
        admin,
    ]
}

impl Store {
    /// Install the seed value of every collection that has never been written.
    pub(crate) fn seed_missing(&self) -> Result<()> {
        self.write_txn(|store| {
            let mut batch = Batch::new();
            let mut seeded = Vec::new();

            for kind in CollectionKind::ALL {
                if store.backend().read(kind)?.is_some() {
                    continue;
                }
                put_seed(&mut batch, kind, None)?;
                seeded.push(kind);
            }

            if !seeded.is_empty() {
                store.commit(batch)?;
                info!(collections = ?seeded, "seeded empty collections");
            }
            Ok(())
        })
    }

    /// Discard all users, swipes, matches and messages and reinstall the seed
    /// dataset, as one atomic write.
    pub fn reset(&self) -> Result<()> {
        self.write_txn(|store| {
            let mut batch = Batch::new();
            for kind in CollectionKind::ALL {
                let revision = store.backend().read(kind)?.map(|b| b.revision);
                put_seed(&mut batch, kind, revision)?;
            }
            store.commit(batch)
        })?;

        info!("store reset to seed data");
        Ok(())
    }
}

fn put_seed(batch: &mut Batch, kind: CollectionKind, revision: Option<u64>) -> Result<()> {
    match kind {
        CollectionKind::Users => batch.put_items(&seed_users(), revision),
        CollectionKind::Likes => batch.put_items::<Like>(&[], revision),
        CollectionKind::Matches => batch.put_items::<Match>(&[], revision),
        CollectionKind::Messages => batch.put_items::<Message>(&[], revision),
    }
}
