//! serial.rs
//!
//! Этот модуль выделяет серийные номера бронирований (SNO) вида `{ACRONYM}-{NNN}`,
//! где ACRONYM - заглавные первые буквы до трех первых слов названия события,
//! а NNN - порядковый номер с ведущими нулями.
//!
//! Ключевые компоненты:
//! 1.  **Чистые функции**: `event_acronym`, `sequence_base` и `format_sno`
//!     не обращаются к базе и напрямую покрыты тестами.
//! 2.  **SequenceBase**: явный признак того, откуда взят базовый номер -
//!     распарсен из старшего существующего SNO или взят из количества
//!     бронирований, когда суффикс не распарсился.
//! 3.  **allocate_sno**: выделение номера внутри транзакции вызывающего кода
//!     под advisory-блокировкой события. Номера уникальны глобально, поэтому
//!     после вычисления кандидата идет ограниченный цикл проверок по всей
//!     таблице бронирований.

use sqlx::PgConnection;
use tracing::warn;

use super::AllocError;

/// Максимум проверок глобальной уникальности на одно выделение.
const MAX_UNIQUENESS_PROBES: u32 = 100;

/// Акроним события: заглавные первые буквы не более чем трех первых слов.
///
/// Для пустого названия акроним пуст и номера вырождаются в `-001` -
/// это допустимый случай, а не ошибка.
pub fn event_acronym(title: &str) -> String {
    title
        .split_whitespace()
        .take(3)
        .filter_map(|word| word.chars().next())
        .flat_map(|c| c.to_uppercase())
        .collect()
}

/// Откуда взят базовый номер последовательности.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceBase {
    /// Числовой суффикс старшего существующего SNO.
    Parsed(i64),
    /// Суффикс не распарсился - берем количество бронирований события.
    FallbackToCount(i64),
}

impl SequenceBase {
    pub fn value(self) -> i64 {
        match self {
            SequenceBase::Parsed(n) | SequenceBase::FallbackToCount(n) => n,
        }
    }
}

/// Определяет базовый номер: суффикс старшего SNO либо, если он не
/// парсится, количество существующих бронирований события.
pub fn sequence_base(highest_sno: Option<&str>, booking_count: i64) -> SequenceBase {
    let Some(sno) = highest_sno else {
        // Бронирований еще нет - начинаем с нуля
        return SequenceBase::Parsed(0);
    };

    match sno.rsplit('-').next().and_then(|tail| tail.parse::<i64>().ok()) {
        Some(n) => SequenceBase::Parsed(n),
        None => SequenceBase::FallbackToCount(booking_count),
    }
}

/// Форматирует SNO: номер дополняется нулями до трех знаков.
pub fn format_sno(acronym: &str, number: i64) -> String {
    format!("{}-{:03}", acronym, number)
}

/// Выделяет уникальный SNO для нового бронирования.
///
/// Вызывается внутри транзакции, в которой затем выполняется INSERT:
/// advisory-блокировка события держится до конца этой транзакции и
/// сериализует конкурентные регистрации на одно событие. Уникальный
/// индекс по `sno` остается последней линией защиты.
pub async fn allocate_sno(
    conn: &mut PgConnection,
    event_id: i64,
    event_title: &str,
) -> Result<String, AllocError> {
    // Сериализуем выделение номеров в рамках одного события
    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(event_id)
        .execute(&mut *conn)
        .await?;

    // Старший SNO события: сортировка по строке, как и сам номер
    let highest: Option<String> = sqlx::query_scalar(
        "SELECT sno FROM bookings WHERE event_id = $1 ORDER BY sno DESC LIMIT 1",
    )
    .bind(event_id)
    .fetch_optional(&mut *conn)
    .await?;

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE event_id = $1")
        .bind(event_id)
        .fetch_one(&mut *conn)
        .await?;

    let base = sequence_base(highest.as_deref(), count);
    if let SequenceBase::FallbackToCount(n) = base {
        warn!(
            "event {}: sno suffix of {:?} is not numeric, falling back to booking count {}",
            event_id, highest, n
        );
    }

    // Номера уникальны глобально: событие с таким же акронимом могло занять
    // кандидата, поэтому при коллизии двигаемся к следующему номеру.
    let acronym = event_acronym(event_title);
    let mut number = base.value() + 1;
    for _ in 0..MAX_UNIQUENESS_PROBES {
        let candidate = format_sno(&acronym, number);
        let taken: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM bookings WHERE sno = $1)")
                .bind(&candidate)
                .fetch_one(&mut *conn)
                .await?;
        if !taken {
            return Ok(candidate);
        }
        number += 1;
    }

    Err(AllocError::RetriesExhausted {
        attempts: MAX_UNIQUENESS_PROBES,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acronym_takes_first_letters_of_up_to_three_words() {
        assert_eq!(event_acronym("Annual Tech Summit"), "ATS");
        assert_eq!(event_acronym("Annual Tech Summit 2025 Edition"), "ATS");
        assert_eq!(event_acronym("hackathon"), "H");
        assert_eq!(event_acronym("rust meetup"), "RM");
    }

    #[test]
    fn acronym_of_empty_title_is_empty() {
        assert_eq!(event_acronym(""), "");
        assert_eq!(event_acronym("   "), "");
    }

    #[test]
    fn first_serial_starts_at_one() {
        let base = sequence_base(None, 0);
        assert_eq!(base, SequenceBase::Parsed(0));
        assert_eq!(format_sno("ATS", base.value() + 1), "ATS-001");
    }

    #[test]
    fn next_serial_is_max_plus_one() {
        let base = sequence_base(Some("ATS-001"), 1);
        assert_eq!(base, SequenceBase::Parsed(1));
        assert_eq!(format_sno("ATS", base.value() + 1), "ATS-002");

        let base = sequence_base(Some("ATS-041"), 12);
        assert_eq!(base, SequenceBase::Parsed(41));
        assert_eq!(format_sno("ATS", base.value() + 1), "ATS-042");
    }

    #[test]
    fn malformed_suffix_falls_back_to_count() {
        assert_eq!(sequence_base(Some("ATS-abc"), 7), SequenceBase::FallbackToCount(7));
        assert_eq!(sequence_base(Some("ATS"), 3), SequenceBase::FallbackToCount(3));
        assert_eq!(sequence_base(Some("ATS-"), 5), SequenceBase::FallbackToCount(5));
    }

    #[test]
    fn empty_acronym_degrades_to_bare_number() {
        let base = sequence_base(None, 0);
        assert_eq!(format_sno("", base.value() + 1), "-001");
        // Суффикс такого номера все равно парсится обратно
        assert_eq!(sequence_base(Some("-001"), 1), SequenceBase::Parsed(1));
    }

    #[test]
    fn numbers_widen_past_three_digits() {
        assert_eq!(format_sno("ATS", 999), "ATS-999");
        assert_eq!(format_sno("ATS", 1000), "ATS-1000");
        assert_eq!(sequence_base(Some("ATS-1000"), 1000), SequenceBase::Parsed(1000));
    }
}
