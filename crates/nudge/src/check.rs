//! The `check` command: validate recurrence specifications.

use miette::Result;

use nudge_scheduler::{Recurrence, RecurrenceUnit};

pub fn run(specs: &[String]) -> Result<()> {
    let mut invalid = 0;

    for spec in specs {
        match Recurrence::parse(spec) {
            Ok(recurrence) => println!("{}\t{}", spec, describe(&recurrence)),
            Err(e) => {
                eprintln!("{}\t{}", spec, e);
                invalid += 1;
            }
        }
    }

    if invalid > 0 {
        return Err(miette::miette!(
            "{} of {} recurrences are invalid",
            invalid,
            specs.len()
        ));
    }
    Ok(())
}

fn describe(recurrence: &Recurrence) -> String {
    let unit = match (recurrence.unit(), recurrence.value()) {
        (RecurrenceUnit::Minutes, 1) => "minute",
        (RecurrenceUnit::Minutes, _) => "minutes",
        (RecurrenceUnit::Hours, 1) => "hour",
        (RecurrenceUnit::Hours, _) => "hours",
        (RecurrenceUnit::Days, 1) => "day",
        (RecurrenceUnit::Days, _) => "days",
    };
    format!(
        "every {} {} ({} seconds)",
        recurrence.value(),
        unit,
        recurrence.duration().num_seconds()
    )
}
