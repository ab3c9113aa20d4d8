#![allow(dead_code)]

//! Shared fixture: a two-interface router over a frame-recording device.

use std::sync::{
    Arc,
    Mutex,
};

use lazy_static::lazy_static;

use miniroute::core::dev::Device;
use miniroute::core::iface::{
    Interface,
    Interfaces,
};
use miniroute::core::repr::{
    eth_types,
    Arp,
    ArpOp,
    EthernetAddress,
    EthernetFrame,
    Icmpv4Packet,
    Icmpv4Repr,
    Ipv4Address,
    Ipv4Packet,
    Ipv4Repr,
};
use miniroute::core::route::{
    RouteEntry,
    RoutingTable,
};
use miniroute::core::services::{
    Router,
    RouterConfig,
};
use miniroute::core::time::MockClock;
use miniroute::Result;

lazy_static! {
    pub static ref ROUTER_ETH0_IP: Ipv4Address = Ipv4Address::new([10, 0, 0, 1]);
    pub static ref ROUTER_ETH1_IP: Ipv4Address = Ipv4Address::new([192, 168, 1, 1]);
    pub static ref HOST_IP: Ipv4Address = Ipv4Address::new([10, 0, 0, 2]);
    pub static ref NEIGHBOR_IP: Ipv4Address = Ipv4Address::new([192, 168, 1, 100]);
}

pub fn router_eth0_mac() -> EthernetAddress {
    EthernetAddress::new([0x02, 0, 0, 0, 0, 0x01])
}

pub fn router_eth1_mac() -> EthernetAddress {
    EthernetAddress::new([0x02, 0, 0, 0, 0, 0x02])
}

pub fn host_mac() -> EthernetAddress {
    EthernetAddress::new([0x0A, 0, 0, 0, 0, 0x01])
}

pub fn neighbor_mac() -> EthernetAddress {
    EthernetAddress::new([0x0A, 0, 0, 0, 0, 0x02])
}

/// Frames handed to the device, in transmission order.
pub type FrameLog = Arc<Mutex<Vec<(String, Vec<u8>)>>>;

struct RecordingDevice {
    log: FrameLog,
}

impl Device for RecordingDevice {
    fn transmit(&mut self, iface_name: &str, frame: &[u8]) -> Result<()> {
        self.log
            .lock()
            .unwrap()
            .push((iface_name.to_string(), frame.to_vec()));
        Ok(())
    }
}

pub struct TestNet {
    pub router: Router<MockClock>,
    pub clock: MockClock,
    pub log: FrameLog,
}

impl TestNet {
    /// Removes and returns everything transmitted so far.
    pub fn sent(&self) -> Vec<(String, Vec<u8>)> {
        self.log.lock().unwrap().drain(..).collect()
    }

    /// Installs a neighbor's mapping by feeding the router an ARP request
    /// from it, then discards the router's reply.
    pub fn seed_neighbor(
        &self,
        iface_name: &str,
        router_addr: Ipv4Address,
        addr: Ipv4Address,
        mac: EthernetAddress,
    ) {
        let frame = build_arp(
            ArpOp::Request,
            mac,
            addr,
            EthernetAddress::BROADCAST,
            router_addr,
        );
        self.router.handle_frame(&frame, iface_name).unwrap();
        self.sent();
    }
}

/// A router with eth0 on 10.0.0.0/24 and eth1 on 192.168.1.0/24, both
/// on-link, plus a gateway route for 172.16.0.0/16 via the eth0 host.
pub fn test_net() -> TestNet {
    let ifaces = Interfaces::new(vec![
        Interface {
            name: "eth0".to_string(),
            addr: *ROUTER_ETH0_IP,
            mask: Ipv4Address::new([255, 255, 255, 0]),
            mac: router_eth0_mac(),
        },
        Interface {
            name: "eth1".to_string(),
            addr: *ROUTER_ETH1_IP,
            mask: Ipv4Address::new([255, 255, 255, 0]),
            mac: router_eth1_mac(),
        },
    ]);

    let mut routes = RoutingTable::new();
    routes.add_route(RouteEntry {
        prefix: Ipv4Address::new([10, 0, 0, 0]),
        mask: Ipv4Address::new([255, 255, 255, 0]),
        gateway: None,
        iface_name: "eth0".to_string(),
    });
    routes.add_route(RouteEntry {
        prefix: Ipv4Address::new([192, 168, 1, 0]),
        mask: Ipv4Address::new([255, 255, 255, 0]),
        gateway: None,
        iface_name: "eth1".to_string(),
    });
    routes.add_route(RouteEntry {
        prefix: Ipv4Address::new([172, 16, 0, 0]),
        mask: Ipv4Address::new([255, 255, 0, 0]),
        gateway: Some(*HOST_IP),
        iface_name: "eth0".to_string(),
    });

    let log: FrameLog = Arc::new(Mutex::new(Vec::new()));
    let dev = RecordingDevice { log: log.clone() };
    let clock = MockClock::new();

    let router = Router::with_clock(
        ifaces,
        routes,
        Box::new(dev),
        RouterConfig::default(),
        clock.clone(),
    );

    TestNet { router, clock, log }
}

/// Builds an Ethernet frame around an arbitrary payload.
pub fn build_frame(
    dst: EthernetAddress,
    src: EthernetAddress,
    payload_type: u16,
    payload: &[u8],
) -> Vec<u8> {
    let mut buffer = vec![0; EthernetFrame::<&[u8]>::buffer_len(payload.len())];
    let mut frame = EthernetFrame::try_new(&mut buffer[..]).unwrap();
    frame.set_dst_addr(dst);
    frame.set_src_addr(src);
    frame.set_payload_type(payload_type);
    frame.payload_mut().copy_from_slice(payload);
    buffer
}

/// Builds an Ethernet frame carrying an IPv4 datagram.
pub fn build_ipv4_frame(
    dst_mac: EthernetAddress,
    src_mac: EthernetAddress,
    src: Ipv4Address,
    dst: Ipv4Address,
    protocol: u8,
    ttl: u8,
    payload: &[u8],
) -> Vec<u8> {
    let repr = Ipv4Repr {
        src_addr: src,
        dst_addr: dst,
        protocol,
        ttl,
        ident: 0x1111,
        payload_len: payload.len(),
    };

    let mut datagram = vec![0; repr.buffer_len()];
    {
        let mut packet = Ipv4Packet::try_new(&mut datagram[..]).unwrap();
        repr.serialize(&mut packet);
        packet.payload_mut().copy_from_slice(payload);
    }

    build_frame(dst_mac, src_mac, eth_types::IPV4, &datagram)
}

/// Builds an ICMP echo request message.
pub fn build_echo_request(id: u16, seq: u16, payload: &[u8]) -> Vec<u8> {
    let mut buffer = vec![0; Icmpv4Packet::<&[u8]>::buffer_len(payload.len())];
    {
        let mut packet = Icmpv4Packet::try_new(&mut buffer[..]).unwrap();
        packet.payload_mut().copy_from_slice(payload);
        Icmpv4Repr::EchoRequest { id, seq }
            .serialize(&mut packet)
            .unwrap();
    }
    buffer
}

/// Builds an Ethernet frame carrying an ARP packet.
pub fn build_arp(
    op: ArpOp,
    source_hw_addr: EthernetAddress,
    source_proto_addr: Ipv4Address,
    target_hw_addr: EthernetAddress,
    target_proto_addr: Ipv4Address,
) -> Vec<u8> {
    let arp = Arp {
        op,
        source_hw_addr,
        source_proto_addr,
        target_hw_addr,
        target_proto_addr,
    };

    let mut payload = vec![0; arp.buffer_len()];
    arp.serialize(&mut payload).unwrap();

    let dst = match op {
        ArpOp::Request => EthernetAddress::BROADCAST,
        ArpOp::Reply => target_hw_addr,
    };

    build_frame(dst, source_hw_addr, eth_types::ARP, &payload)
}

/// Asserts a transmitted frame is IPv4 and returns its datagram bytes.
pub fn unwrap_ipv4(frame: &[u8]) -> Vec<u8> {
    let eth_frame = EthernetFrame::try_new(frame).unwrap();
    assert_eq!(eth_frame.payload_type(), eth_types::IPV4);
    eth_frame.payload().to_vec()
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
