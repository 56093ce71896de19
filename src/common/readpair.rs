///////////////////////////////
/// Position of a read pair in the raw input. Used as read name towards external engines
/// and as the reference held by Deduplicated verdicts
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairId(pub u64);

impl std::fmt::Display for PairId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PairId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(PairId(s.parse::<u64>()?))
    }
}

///////////////////////////////
/// One raw paired-end record. Stages never modify a pair, they derive new ones
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadPair {
    pub id: PairId,
    pub name: Vec<u8>,
    pub r1: Vec<u8>,
    pub q1: Vec<u8>,
    pub r2: Vec<u8>,
    pub q2: Vec<u8>,
}

impl ReadPair {
    ///////////////////////////////
    /// New pair sharing identity and forward read, with a replaced reverse read
    pub fn with_reverse(&self, r2: &[u8], q2: &[u8]) -> ReadPair {
        ReadPair {
            id: self.id,
            name: self.name.clone(),
            r1: self.r1.clone(),
            q1: self.q1.clone(),
            r2: r2.to_vec(),
            q2: q2.to_vec(),
        }
    }
}

impl std::fmt::Display for ReadPair {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            String::from_utf8_lossy(&self.name),
            String::from_utf8_lossy(&self.r1),
            String::from_utf8_lossy(&self.r2)
        )
    }
}
