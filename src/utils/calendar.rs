// Arithmétique calendaire pour les sessions récurrentes.
// On décale l'heure LOCALE (fuseau de l'organisation) puis on revient en UTC:
// une session à 09:00 reste à 09:00 après un changement d'heure.

use chrono::{DateTime, Days, Duration, LocalResult, NaiveDateTime, Offset, TimeZone, Utc};
use chrono_tz::Tz;

use crate::models::session::Recurrence;

/// Décale `t` de `index` jours (DAILY) ou semaines (WEEKLY) dans le fuseau `tz`
pub fn shift(t: DateTime<Utc>, recurrence: Recurrence, index: u32, tz: Tz) -> Option<DateTime<Utc>> {
    let days = match recurrence {
        Recurrence::None => return if index == 0 { Some(t) } else { None },
        Recurrence::Daily => u64::from(index),
        Recurrence::Weekly => u64::from(index) * 7,
    };

    let local = t.with_timezone(&tz).naive_local();
    let shifted = local.checked_add_days(Days::new(days))?;

    resolve_local(shifted, tz).map(|dt| dt.with_timezone(&Utc))
}

/// Heure ambiguë (repli d'automne): on garde la première occurrence.
/// Heure inexistante (saut de printemps): on avance de la durée du saut,
/// ce qui revient à lire l'heure locale avec le décalage d'avant le saut.
fn resolve_local(local: NaiveDateTime, tz: Tz) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => {
            let before_gap = local.checked_sub_signed(Duration::days(1))?;
            let offset = tz.offset_from_utc_datetime(&before_gap).fix();
            let utc = local.checked_sub_signed(Duration::seconds(i64::from(offset.local_minus_utc())))?;
            Some(tz.from_utc_datetime(&utc))
        }
    }
}
