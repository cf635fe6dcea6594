use micasa_core::{CredentialHasher, HashParams, User, UserRepository};
use micasa_core_types::CancellationToken;
use micasa_store::{apply_migrations, default_catalog, SqliteUserRepo, Store};

/// Password of every fixture user
#[allow(dead_code)]
pub const TEST_PASSWORD: &str = "secret";

/// Login names and full names of the fixture users
#[allow(dead_code)]
pub const TEST_USERS: [(&str, &str); 10] = [
    ("boe", "Face of Boe"),
    ("tardis", "Time And Relative Dimension In Space"),
    ("k9", "K-9 Mark III"),
    ("donna", "Donna Noble"),
    ("doctor", "The Doctor"),
    ("rory", "Rory Williams"),
    ("amy", "Amelia Pond"),
    ("badwolf", "Rose Tyler"),
    ("clara", "Clara Oswald"),
    ("knightmare", "Sir Knightmare"),
];

/// Low-cost hasher so fixtures stay fast
#[allow(dead_code)]
pub fn test_hasher() -> CredentialHasher {
    CredentialHasher::with_params(HashParams::TESTING)
}

/// Open an in-memory store with the application schema applied
#[allow(dead_code)]
pub fn migrated_store() -> Store {
    let store = Store::open_in_memory().expect("open in-memory store");
    apply_migrations(&store, &default_catalog(), &CancellationToken::new())
        .expect("apply default catalog");
    store
}

/// Repository over a freshly migrated in-memory store
#[allow(dead_code)]
pub fn new_repo() -> SqliteUserRepo {
    SqliteUserRepo::with_hasher(migrated_store(), test_hasher())
}

/// Build an unsaved user with the fixture password
#[allow(dead_code)]
pub fn test_user(name: &str, full_name: &str) -> User {
    let mut user = User::new(name, full_name);
    user.set_password_with(&test_hasher(), TEST_PASSWORD)
        .expect("hash fixture password");
    user
}

/// Insert all fixture users, returning them as stored
#[allow(dead_code)]
pub fn seed_users(repo: &SqliteUserRepo) -> Vec<User> {
    let cancel = CancellationToken::new();
    TEST_USERS
        .iter()
        .map(|(name, full_name)| {
            let mut user = test_user(name, full_name);
            repo.create(&mut user, &cancel).expect("create fixture user");
            user
        })
        .collect()
}
