//! slug.rs
//!
//! Генерация уникальных URL-слагов для событий. Слаг выделяется один раз
//! при создании события и дальше не пересчитывается; занятая база
//! разрешается суффиксами `-1`, `-2` и так далее.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashSet;
use std::hash::{Hash, Hasher};

use sqlx::PgConnection;

use super::AllocError;

/// Нормализует заголовок в базовый слаг: нижний регистр, каждая
/// последовательность не-алфавитно-цифровых символов заменяется одним
/// дефисом, ведущие и хвостовые дефисы отбрасываются.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_hyphen = false;
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            // to_lowercase может дать комбинируемые знаки ('İ' -> "i\u{307}") - их отбрасываем
            for lower in ch.to_lowercase().filter(|c| c.is_alphanumeric()) {
                slug.push(lower);
            }
            pending_hyphen = false;
        } else {
            pending_hyphen = true;
        }
    }
    slug
}

/// Подбирает слаг, отсутствующий в `existing`: сначала база, затем
/// `база-1`, `база-2`, ... Детерминирована относительно набора занятых
/// слагов и завершается не более чем за |existing|+1 шагов.
pub fn unique_slug(title: &str, existing: &HashSet<String>) -> String {
    let base = slugify(title);
    if !existing.contains(&base) {
        return base;
    }

    let mut counter = 1u64;
    loop {
        let candidate = format!("{}-{}", base, counter);
        if !existing.contains(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

/// Выделяет уникальный слаг внутри транзакции вызывающего кода.
///
/// Advisory-блокировка берется по хешу базового слага: конкурентные
/// создания событий с одинаковым названием сериализуются, с разными -
/// проходят независимо. Уникальный индекс по `slug` остается последней
/// линией защиты.
pub async fn allocate_slug(conn: &mut PgConnection, title: &str) -> Result<String, AllocError> {
    let base = slugify(title);

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(lock_key(&base))
        .execute(&mut *conn)
        .await?;

    // Занятые варианты: сама база и все ее суффиксные формы
    let taken: Vec<String> =
        sqlx::query_scalar("SELECT slug FROM events WHERE slug = $1 OR slug LIKE $1 || '-%'")
            .bind(&base)
            .fetch_all(&mut *conn)
            .await?;

    Ok(unique_slug(title, &taken.into_iter().collect()))
}

// Ключ advisory-блокировки из базового слага
fn lock_key(base: &str) -> i64 {
    let mut hasher = DefaultHasher::new();
    base.hash(&mut hasher);
    hasher.finish() as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn slugify_lowercases_and_hyphenates() {
        assert_eq!(slugify("Annual Tech Summit"), "annual-tech-summit");
        assert_eq!(slugify("Rust & Friends: 2025!"), "rust-friends-2025");
        assert_eq!(slugify("  padded   title  "), "padded-title");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn repeated_titles_get_counter_suffixes() {
        let mut existing = HashSet::new();
        let first = unique_slug("Annual Tech Summit", &existing);
        assert_eq!(first, "annual-tech-summit");
        existing.insert(first);

        let second = unique_slug("Annual Tech Summit", &existing);
        assert_eq!(second, "annual-tech-summit-1");
        existing.insert(second);

        assert_eq!(unique_slug("Annual Tech Summit", &existing), "annual-tech-summit-2");
    }

    #[test]
    fn gaps_in_counters_are_not_reused_out_of_order() {
        let existing: HashSet<String> =
            ["demo", "demo-1", "demo-3"].into_iter().map(String::from).collect();
        // -2 свободен и берется раньше, чем -4
        assert_eq!(unique_slug("Demo", &existing), "demo-2");
    }

    proptest! {
        #[test]
        fn slugify_output_is_url_safe(title in ".{0,60}") {
            let slug = slugify(&title);
            prop_assert!(slug.chars().all(|c| c.is_alphanumeric() || c == '-'));
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
        }

        #[test]
        fn unique_slug_is_never_a_member_of_the_existing_set(
            title in ".{0,40}",
            taken in prop::collection::hash_set("[a-z0-9-]{0,12}", 0..24),
        ) {
            let slug = unique_slug(&title, &taken);
            prop_assert!(!taken.contains(&slug));
        }
    }
}
