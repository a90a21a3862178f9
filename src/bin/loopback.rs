use log::info;
use seqlink::{
    layer::{IntfBuilder, SendError},
    protocol::{packet::DEFAULT_PORT, Address, Level, Packet, PacketBuilder},
    transport::{Side, WireBuilder},
};

const PACKETS: usize = 200;
const LOSS_PERCENT: u32 = 10;
const WIRE_DEPTH: usize = 8;
const SEQ_TIMEOUT: u32 = 20;
const MAX_TICKS: u32 = 100_000;
const DST_PORT: u16 = 0x10;

/// Linear congruential generator; good enough to pick frames to lose.
struct Lcg(u32);

impl Lcg {
    fn next_percent(&mut self) -> u32 {
        self.0 = self.0.wrapping_mul(1_103_515_245).wrapping_add(12_345);
        (self.0 >> 16) % 100
    }
}

fn main() {
    env_logger::init();

    let mut a = IntfBuilder {
        name: "a".to_string(),
        addr: Address::short(1),
        seq_timeout: SEQ_TIMEOUT,
        ..IntfBuilder::default()
    }
    .build()
    .unwrap();
    let mut b = IntfBuilder {
        name: "b".to_string(),
        addr: Address::short(2),
        seq_timeout: SEQ_TIMEOUT,
        ..IntfBuilder::default()
    }
    .build()
    .unwrap();
    let mut wire = WireBuilder { depth: WIRE_DEPTH }.build();
    let mut rng = Lcg(0x5eed);

    let mut next = 0;
    let mut held: Option<Packet> = None;
    let mut delivered = Vec::new();

    let mut now = 0;
    while delivered.len() < PACKETS && now < MAX_TICKS {
        // queue as much as the pool takes
        while next < PACKETS {
            let pkt = match held.take() {
                Some(pkt) => pkt,
                None => PacketBuilder {
                    level: Level::L1,
                    dst: b.addr(),
                    src_port: DEFAULT_PORT,
                    dst_port: DST_PORT,
                    seq: true,
                    dat: &(next as u16).to_be_bytes(),
                }
                .build()
                .unwrap(),
            };
            match a.send(pkt) {
                Ok(()) => next += 1,
                Err(SendError(pkt)) => {
                    held = Some(pkt);
                    break;
                }
            }
        }

        a.poll_transmit(&mut wire.end(Side::A), now);
        wire.drop_where(Side::B, |_| rng.next_percent() < LOSS_PERCENT);
        b.poll_receive(&mut wire.end(Side::B));
        while let Some(pkt) = b.recv() {
            delivered.push(u16::from_be_bytes([pkt.dat()[0], pkt.dat()[1]]));
        }

        b.poll_transmit(&mut wire.end(Side::B), now);
        wire.drop_where(Side::A, |_| rng.next_percent() < LOSS_PERCENT);
        a.poll_receive(&mut wire.end(Side::A));

        now += 1;
    }

    let in_order = delivered.windows(2).all(|w| w[0] < w[1]);
    info!("finished at tick {}", now);
    println!(
        "delivered {}/{} in {} ticks, in order: {}",
        delivered.len(),
        PACKETS,
        now,
        in_order
    );
    println!("a: {:?}", a.stat());
    println!("b: {:?}", b.stat());
}
