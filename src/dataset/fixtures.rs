use super::{Dataset, parse_csv};

pub const SAMPLE_ROWS: usize = 8;

/// Eight observations across four locations, Dec 2023 to Apr 2024.
///
/// Row 3 carries a +01:00 offset (22:00 UTC). Row 5 has no adult count and
/// row 7 has no weather.
pub const SAMPLE_CSV: &str = "\
id,timestamp,location_id,location_name,weather_condition,pedestrians_count,child_pedestrians_count,adult_pedestrians_count,temperature
1,2024-01-15T08:00:00Z,331,Bahnhofstrasse (Nord),fog,100,10,90,1.5
2,2024-01-15T09:00:00Z,329,Bahnhofstrasse (Süd),clear-day,50,5,45,2.0
3,2024-01-16T08:00:00Z,331,Bahnhofstrasse (Nord),Fog,100,30,70,0.5
4,2024-02-03T23:00:00+01:00,330,Lintheschergasse,rain,20,2,18,4.0
5,2024-03-05T23:59:59Z,331,Bahnhofstrasse (Nord),partly-cloudy-day,20,4,16,8.0
6,2024-03-06T00:00:00Z,331,Bahnhofstrasse (Nord),fog,1,1,,7.5
7,2023-12-31T12:00:00Z,331,Bahnhofstrasse (Nord),fog,100,50,50,-1.0
8,2024-04-10T10:00:00Z,331,Bahnhofstrasse (Nord),,10,3,7,12.0
";

pub fn sample_dataset() -> Dataset {
    let table = parse_csv(SAMPLE_CSV.as_bytes()).expect("fixture CSV parses");
    Dataset::from_table(table).expect("fixture has timestamps")
}
