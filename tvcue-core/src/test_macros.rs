macro_rules! show {
    ($id:expr) => {
        Show {
            id: $id.into(),
            name: format!("show {}", $id),
            image: None,
            network: None,
        }
    };
}

macro_rules! episode {
    ($id:expr, $show:expr, $airtime:expr) => {
        Episode {
            id: $id.into(),
            name: format!("episode {}", $id),
            season: 1,
            number: $id,
            airtime: $airtime.map(|airtime: &str| airtime.to_string()),
            show: show!($show),
        }
    };
    ($id:expr, $show:expr) => {
        episode!($id, $show, Some("20:00"))
    };
}
