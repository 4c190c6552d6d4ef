//! Node/capability aggregation for `GetNodes` replies.
//!
//! Each streamed reply describes one loaded launch file.  Robot descriptions
//! and their capabilities arrive as flat lists (capabilities never nest), and
//! nodelet groups arrive as a list of `(manager, nodes)` pairs that is folded
//! into a map.

use std::collections::BTreeMap;

use fleetlaunch_types::wire::{CapabilityMsg, ListNodesReply, RobotDescriptionMsg};
use fleetlaunch_types::{Capability, NodeListResult, RobotDescription, TransportError};
use futures_util::TryStreamExt;
use tracing::debug;

use crate::call::TypedStream;

/// Convert one `GetNodes` reply.
pub fn aggregate(reply: ListNodesReply) -> NodeListResult {
    let robot_descriptions = reply
        .description
        .into_iter()
        .map(robot_description)
        .collect();

    let mut nodelets: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for group in reply.nodelets {
        nodelets.entry(group.manager).or_default().extend(group.nodes);
    }

    NodeListResult {
        path: reply.launch_file,
        masteruri: reply.masteruri,
        host: reply.host,
        nodes: reply.node,
        robot_descriptions,
        nodelets,
    }
}

fn robot_description(msg: RobotDescriptionMsg) -> RobotDescription {
    RobotDescription {
        machine: msg.machine,
        robot_name: msg.robot_name,
        robot_type: msg.robot_type,
        robot_images: msg.robot_images,
        robot_descr: msg.robot_descr,
        capabilities: msg.capabilities.into_iter().map(capability).collect(),
    }
}

fn capability(msg: CapabilityMsg) -> Capability {
    Capability {
        name: msg.name,
        namespace: msg.namespace,
        cap_type: msg.cap_type,
        images: msg.images,
        description: msg.description,
        nodes: msg.nodes,
    }
}

/// Drain the whole `GetNodes` stream, one result per reply, in stream order.
pub async fn collect_node_lists(
    mut replies: TypedStream<ListNodesReply>,
) -> Result<Vec<NodeListResult>, TransportError> {
    let mut results = Vec::new();
    while let Some(reply) = replies.try_next().await? {
        results.push(aggregate(reply));
    }
    debug!(launch_files = results.len(), "node lists collected");
    Ok(results)
}
