/// Test fixtures: small but structurally faithful input files.
///
/// Shapes:
///   `.tenv`       : whitespace columns, 16 per line (17 when a reference
///                    longitude is inserted before delta E); date is YYMMMDD
///   stations.txt  : `ID LAT LON [HEIGHT]`, `#` comments
///   earthquakes.csv: header-driven CSV, origin_time in several accepted forms
///
/// The synthetic network puts AAAA at (0, 0) and BBBB at (0, 1°) with an
/// M6.1 event halfway between them on 2020-01-05. Both stations jump by
/// (+3 cm E, +4 cm N) across the event, so the step displacement is 5 cm.

/// Station AAAA: six days around the event, one malformed line.
#[cfg(test)]
pub(crate) fn fixture_tenv_aaaa() -> &'static str {
    "\
AAAA 20JAN01 2020.0014 58849 2086 3 0.0010 0.0020 0.0030 0.0000 0.0005 0.0005 0.0020 0.010 0.020 0.030
AAAA 20JAN02 2020.0041 58850 2086 4 0.0012 0.0021 0.0031 0.0000 0.0005 0.0005 0.0020 0.010 0.020 0.030
AAAA 20JAN03 2020.0068 58851 2086 5 garbage 0.0021 0.0031 0.0000 0.0005 0.0005 0.0020 0.010 0.020 0.030
AAAA 20JAN04 2020.0096 58852 2086 6 0.0011 0.0019 0.0029 0.0000 0.0005 0.0005 0.0020 0.010 0.020 0.030
AAAA 20JAN06 2020.0150 58854 2087 1 0.0311 0.0419 0.0029 0.0000 0.0005 0.0005 0.0020 0.010 0.020 0.030
AAAA 20JAN07 2020.0178 58855 2087 2 0.0312 0.0420 0.0030 0.0000 0.0005 0.0005 0.0020 0.010 0.020 0.030
"
}

/// Station BBBB: 17-column layout (reference longitude in column 6).
#[cfg(test)]
pub(crate) fn fixture_tenv_bbbb() -> &'static str {
    "\
BBBB 20JAN02 2020.0041 58850 2086 4 1.0000 0.0030 0.0010 -0.0020 0.0000 0.0005 0.0005 0.0020 0.010 0.020 0.030
BBBB 20JAN04 2020.0096 58852 2086 6 1.0000 0.0030 0.0010 -0.0020 0.0000 0.0005 0.0005 0.0020 0.010 0.020 0.030
BBBB 20JAN06 2020.0150 58854 2087 1 1.0000 0.0330 0.0410 -0.0020 0.0000 0.0005 0.0005 0.0020 0.010 0.020 0.030
BBBB 20JAN08 2020.0205 58856 2087 3 1.0000 0.0332 0.0412 -0.0018 0.0000 0.0005 0.0005 0.0020 0.010 0.020 0.030
"
}

/// Station FARS: far from every event, quiet series.
#[cfg(test)]
pub(crate) fn fixture_tenv_fars() -> &'static str {
    "\
FARS 20JAN01 2020.0014 58849 2086 3 0.0000 0.0000 0.0000 0.0000 0.0005 0.0005 0.0020 0.010 0.020 0.030
FARS 20JAN02 2020.0041 58850 2086 4 0.0001 0.0001 0.0001 0.0000 0.0005 0.0005 0.0020 0.010 0.020 0.030
"
}

/// Station positions, including one malformed line and a 0-360 longitude.
#[cfg(test)]
pub(crate) fn fixture_positions() -> &'static str {
    "\
# station  lat  lon  height
AAAA   0.0000    0.0000   12.0
BBBB   0.0000    1.0000   15.5
FARS  45.0000  260.0000  300.0
BROK  not-a-lat  10.0
"
}

/// Event catalog with every accepted origin_time form and one bad row.
#[cfg(test)]
pub(crate) fn fixture_events_csv() -> &'static str {
    "\
event_id,magnitude,latitude,longitude,origin_time,depth_km
ev_mid,6.1,0.0,0.5,2020-01-05T10:00:00Z,10.0
ev_small,3.2,0.0,0.2,2020-01-03 08:30:00,
ev_far,4.5,-30.0,150.0,2019-06-01,33.0
ev_bad,not-a-number,0.0,0.0,2020-01-01,
"
}

/// The fixture network parsed into a dataset, without touching the disk.
#[cfg(test)]
pub(crate) fn fixture_dataset() -> crate::dataset::Dataset {
    use crate::dataset::Dataset;
    use crate::events::EventCatalog;
    use crate::ingest::{catalog, positions, tenv};
    use crate::model::Station;
    use crate::stations::StationTable;
    use std::path::Path;

    let (positions, _) = positions::parse_positions("stations.txt", fixture_positions());
    let series = [
        ("AAAA", fixture_tenv_aaaa()),
        ("BBBB", fixture_tenv_bbbb()),
        ("FARS", fixture_tenv_fars()),
    ];

    let stations = positions.into_iter().filter_map(|p| {
        let (_, text) = series.iter().find(|(id, _)| *id == p.station_id)?;
        Some(Station {
            samples: tenv::parse_tenv(&p.station_id, text).samples,
            station_id: p.station_id,
            position: p.position,
        })
    });

    let (events, _) =
        catalog::parse_catalog(Path::new("earthquakes.csv"), fixture_events_csv().as_bytes()).unwrap();

    Dataset::new(StationTable::new(stations), EventCatalog::new(events))
}
